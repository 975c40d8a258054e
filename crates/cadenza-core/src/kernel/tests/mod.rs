mod bootstrap_tests;
mod component_tests;
