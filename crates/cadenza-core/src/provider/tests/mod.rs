mod entries_tests;
mod host_tests;
mod manifest_tests;
mod resolver_tests;
