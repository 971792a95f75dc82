// Library exports for the admin CLI so command logic can be tested

pub mod commands;
