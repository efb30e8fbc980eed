pub mod adapters;
pub mod configuration;
pub mod controllers;
pub mod domain;
pub mod ports;
pub mod repositories;
pub mod startup;
pub mod use_cases;
