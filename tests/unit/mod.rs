mod lifecycle_tests;
mod sequence_tests;
mod validation_tests;
