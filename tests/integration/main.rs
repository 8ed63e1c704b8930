mod runner_test;
mod test_utils;
mod ventilator_test;

#[cfg(feature = "integration-tests")]
mod route53_test;
