// src/driver/wait.rs

use super::{Driver, DriverError, Element, Locator};
use std::thread;
use std::time::{Duration, Instant};
use tracing::trace;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    /// Upper bound for a single wait.
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl WaitPolicy {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
        }
    }
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT, DEFAULT_POLL_INTERVAL)
    }
}

/// Polls the driver until a condition holds or the policy's timeout passes.
#[derive(Debug, Clone)]
pub struct Waiter {
    policy: WaitPolicy,
}

impl Waiter {
    pub fn new(policy: WaitPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> WaitPolicy {
        self.policy
    }

    /// Run `probe` until it yields a value. Errors from `probe` end the wait
    /// immediately; running out of time yields [`DriverError::Timeout`]
    /// naming `what`.
    pub fn until<T, F>(&self, driver: &mut dyn Driver, what: &str, mut probe: F) -> Result<T, DriverError>
    where
        F: FnMut(&mut dyn Driver) -> Result<Option<T>, DriverError>,
    {
        let start = Instant::now();
        let mut polls = 0u32;
        loop {
            polls += 1;
            if let Some(found) = probe(&mut *driver)? {
                trace!(what, polls, "condition met");
                return Ok(found);
            }
            let waited = start.elapsed();
            if waited >= self.policy.timeout {
                return Err(DriverError::Timeout {
                    locator: what.to_string(),
                    waited,
                });
            }
            thread::sleep(self.policy.poll_interval.min(self.policy.timeout - waited));
        }
    }

    /// First element matching `locator`, once one exists.
    pub fn until_present(&self, driver: &mut dyn Driver, locator: &Locator) -> Result<Element, DriverError> {
        self.until(driver, &locator.to_string(), |d| {
            Ok(d.find_elements(locator)?.into_iter().next())
        })
    }

    /// Every element matching `locator`, once at least one exists.
    pub fn until_all_present(
        &self,
        driver: &mut dyn Driver,
        locator: &Locator,
    ) -> Result<Vec<Element>, DriverError> {
        self.until(driver, &locator.to_string(), |d| {
            let found = d.find_elements(locator)?;
            Ok(if found.is_empty() { None } else { Some(found) })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::stub::StubDriver;

    fn quick() -> Waiter {
        Waiter::new(WaitPolicy::new(
            Duration::from_millis(60),
            Duration::from_millis(5),
        ))
    }

    #[test]
    fn test_waits_for_late_element() {
        let (mut driver, journal) = StubDriver::new();
        driver.delay_results(3);
        driver.navigate("stub://portal/query").unwrap();
        let input = driver.find_element(&Locator::name("q")).unwrap();
        driver.send_input(&input, "ABC").unwrap();
        let go = driver.find_element(&Locator::name("go")).unwrap();
        driver.click(&go).unwrap();

        let table = quick()
            .until_present(&mut driver, &Locator::css("table"))
            .unwrap();
        assert_eq!(table.tag, "table");
        assert!(journal.count("find css=table") >= 4);
    }

    #[test]
    fn test_times_out() {
        let (mut driver, _journal) = StubDriver::new();
        driver.navigate("stub://portal/query").unwrap();
        let err = quick()
            .until_all_present(&mut driver, &Locator::css("table"))
            .unwrap_err();
        match err {
            DriverError::Timeout { locator, waited } => {
                assert_eq!(locator, "css=table");
                assert!(waited >= Duration::from_millis(60));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_probe_error_ends_wait() {
        let (mut driver, _journal) = StubDriver::new();
        let err = quick()
            .until(&mut driver, "custom", |_| {
                Err::<Option<()>, _>(DriverError::NoPage)
            })
            .unwrap_err();
        assert_eq!(err, DriverError::NoPage);
    }
}
