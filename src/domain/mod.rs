pub mod actor;
pub mod anim;
pub mod layer;
pub mod physics;
pub mod rules;
