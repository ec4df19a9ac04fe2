pub mod activities;
pub mod ml_models;
pub mod nodes;
pub mod samples;
