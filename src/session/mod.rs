// src/session/mod.rs

use crate::driver::{Driver, DriverError, Element, Locator, WaitPolicy, Waiter};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("automation is already running")]
    AlreadyRunning,
    #[error("automation is not running, so the driver is not available")]
    NotRunning,
}

/// Errors from operations that need a live driver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error(transparent)]
    Driver(#[from] DriverError),
}

/// Where a session is in its life.
pub enum SessionState {
    Idle,
    Running {
        driver: Box<dyn Driver>,
        wait: Waiter,
    },
    /// Torn down after an error; [`Session::reset`] returns to `Idle`.
    Failed,
}

impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => f.write_str("Idle"),
            SessionState::Running { wait, .. } => f
                .debug_struct("Running")
                .field("wait", &wait.policy())
                .finish_non_exhaustive(),
            SessionState::Failed => f.write_str("Failed"),
        }
    }
}

/// Owns the driver between `start` and `finish`/`fail`. Outside that window
/// every driver operation fails with [`LifecycleError::NotRunning`].
#[derive(Debug)]
pub struct Session {
    state: SessionState,
    policy: WaitPolicy,
}

impl Session {
    pub fn new(policy: WaitPolicy) -> Self {
        Self {
            state: SessionState::Idle,
            policy,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, SessionState::Running { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.state, SessionState::Failed)
    }

    /// Bind `driver` and derive the wait helper. Only valid from `Idle`.
    pub fn start(&mut self, driver: Box<dyn Driver>) -> Result<(), LifecycleError> {
        if !matches!(self.state, SessionState::Idle) {
            return Err(LifecycleError::AlreadyRunning);
        }
        debug!(timeout = ?self.policy.timeout, "session started");
        self.state = SessionState::Running {
            driver,
            wait: Waiter::new(self.policy),
        };
        Ok(())
    }

    /// Quit the driver and return to `Idle`.
    pub fn finish(&mut self) -> Result<(), LifecycleError> {
        self.teardown(SessionState::Idle)
    }

    /// Quit the driver and move to `Failed`.
    pub fn fail(&mut self) -> Result<(), LifecycleError> {
        self.teardown(SessionState::Failed)
    }

    /// `Failed` back to `Idle`. No effect in any other state.
    pub fn reset(&mut self) {
        if self.is_failed() {
            self.state = SessionState::Idle;
        }
    }

    fn teardown(&mut self, next: SessionState) -> Result<(), LifecycleError> {
        match std::mem::replace(&mut self.state, next) {
            SessionState::Running { mut driver, .. } => {
                if let Err(e) = driver.quit() {
                    warn!(error = %e, "driver quit failed");
                }
                info!(state = ?self.state, "session finished");
                Ok(())
            }
            previous => {
                self.state = previous;
                Err(LifecycleError::NotRunning)
            }
        }
    }

    /// Driver-level access for automations. The handle cannot start, end or
    /// replace the session.
    pub fn browser(&mut self) -> Browser<'_> {
        Browser { session: self }
    }

    pub fn wait(&self) -> Result<&Waiter, LifecycleError> {
        match &self.state {
            SessionState::Running { wait, .. } => Ok(wait),
            _ => Err(LifecycleError::NotRunning),
        }
    }

    fn driver(&mut self) -> Result<&mut dyn Driver, LifecycleError> {
        match &mut self.state {
            SessionState::Running { driver, .. } => Ok(driver.as_mut()),
            _ => Err(LifecycleError::NotRunning),
        }
    }

    fn parts(&mut self) -> Result<(&mut dyn Driver, &Waiter), LifecycleError> {
        match &mut self.state {
            SessionState::Running { driver, wait } => Ok((driver.as_mut(), &*wait)),
            _ => Err(LifecycleError::NotRunning),
        }
    }
}

/// What an automation may do with a running session: page operations only.
/// Every call fails with [`LifecycleError::NotRunning`] outside the
/// start/finish window.
pub struct Browser<'s> {
    session: &'s mut Session,
}

impl Browser<'_> {
    pub fn is_running(&self) -> bool {
        self.session.is_running()
    }

    pub fn navigate(&mut self, url: &str) -> Result<(), SessionError> {
        Ok(self.session.driver()?.navigate(url)?)
    }

    pub fn current_url(&mut self) -> Result<String, SessionError> {
        Ok(self.session.driver()?.current_url()?)
    }

    /// Wait for an element matching `locator`, bounded by the wait policy.
    pub fn await_element(&mut self, locator: &Locator) -> Result<Element, SessionError> {
        let (driver, wait) = self.session.parts()?;
        Ok(wait.until_present(driver, locator)?)
    }

    /// Wait until at least one element matches `locator`, then return all.
    pub fn await_elements(&mut self, locator: &Locator) -> Result<Vec<Element>, SessionError> {
        let (driver, wait) = self.session.parts()?;
        Ok(wait.until_all_present(driver, locator)?)
    }

    /// Look up matches right now, without waiting.
    pub fn find_elements(&mut self, locator: &Locator) -> Result<Vec<Element>, SessionError> {
        Ok(self.session.driver()?.find_elements(locator)?)
    }

    pub fn send_input(&mut self, element: &Element, text: &str) -> Result<(), SessionError> {
        Ok(self.session.driver()?.send_input(element, text)?)
    }

    pub fn click(&mut self, element: &Element) -> Result<(), SessionError> {
        Ok(self.session.driver()?.click(element)?)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(WaitPolicy::default())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("session dropped while running; quitting driver");
            let _ = self.fail();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::stub::StubDriver;
    use std::time::Duration;

    fn policy() -> WaitPolicy {
        WaitPolicy::new(Duration::from_millis(30), Duration::from_millis(5))
    }

    #[test]
    fn test_idle_rejects_driver_access() {
        let mut s = Session::new(policy());
        assert!(s.driver().is_err());
        assert_eq!(s.wait().err(), Some(LifecycleError::NotRunning));
        assert_eq!(
            s.browser().navigate("stub://x"),
            Err(SessionError::Lifecycle(LifecycleError::NotRunning))
        );
        assert_eq!(
            s.browser().await_element(&Locator::name("q")),
            Err(SessionError::Lifecycle(LifecycleError::NotRunning))
        );
        assert_eq!(s.finish(), Err(LifecycleError::NotRunning));
    }

    #[test]
    fn test_double_start() {
        let (first, journal) = StubDriver::new();
        let (second, _) = StubDriver::new();
        let mut s = Session::new(policy());
        s.start(Box::new(first)).unwrap();
        assert_eq!(
            s.start(Box::new(second)).err(),
            Some(LifecycleError::AlreadyRunning)
        );
        assert!(s.is_running());
        s.finish().unwrap();
        assert_eq!(journal.count("quit"), 1);
    }

    #[test]
    fn test_finish_quits_exactly_once() {
        let (driver, journal) = StubDriver::new();
        let mut s = Session::new(policy());
        s.start(Box::new(driver)).unwrap();
        s.browser().navigate("stub://portal/query").unwrap();
        assert_eq!(s.browser().current_url().unwrap(), "stub://portal/query");

        s.finish().unwrap();
        assert!(matches!(s.state(), SessionState::Idle));
        assert_eq!(s.finish(), Err(LifecycleError::NotRunning));
        assert_eq!(
            s.browser().current_url(),
            Err(SessionError::Lifecycle(LifecycleError::NotRunning))
        );
        assert_eq!(journal.count("quit"), 1);
    }

    #[test]
    fn test_fail_and_reset() {
        let (driver, journal) = StubDriver::new();
        let (again, _) = StubDriver::new();
        let mut s = Session::new(policy());
        s.start(Box::new(driver)).unwrap();
        s.fail().unwrap();
        assert!(s.is_failed());
        assert_eq!(journal.count("quit"), 1);

        assert_eq!(
            s.start(Box::new(again)).err(),
            Some(LifecycleError::AlreadyRunning)
        );
        s.reset();
        let (third, _) = StubDriver::new();
        s.start(Box::new(third)).unwrap();
        assert!(s.is_running());
    }

    #[test]
    fn test_drop_quits_running_driver() {
        let (driver, journal) = StubDriver::new();
        {
            let mut s = Session::new(policy());
            s.start(Box::new(driver)).unwrap();
        }
        assert_eq!(journal.count("quit"), 1);
    }

    #[test]
    fn test_await_element_times_out() {
        let (driver, _journal) = StubDriver::new();
        let mut s = Session::new(policy());
        s.start(Box::new(driver)).unwrap();
        let mut b = s.browser();
        b.navigate("stub://portal/query").unwrap();
        let err = b.await_element(&Locator::css("table")).unwrap_err();
        assert!(matches!(
            err,
            SessionError::Driver(DriverError::Timeout { .. })
        ));
        // the field is there without waiting
        let q = b.await_element(&Locator::name("q")).unwrap();
        b.send_input(&q, "ABC").unwrap();
    }

    #[test]
    fn test_browser_leaves_lifecycle_to_owner() {
        let (driver, journal) = StubDriver::new();
        let mut s = Session::new(policy());
        s.start(Box::new(driver)).unwrap();
        {
            let mut b = s.browser();
            b.navigate("stub://portal/query").unwrap();
            let q = b.await_element(&Locator::name("q")).unwrap();
            b.send_input(&q, "001").unwrap();
            let go = b.await_element(&Locator::name("go")).unwrap();
            b.click(&go).unwrap();
            assert_eq!(b.find_elements(&Locator::css("table")).unwrap().len(), 1);
            assert!(b.is_running());
        }
        // page work never ends the session
        assert!(s.is_running());
        assert_eq!(journal.count("quit"), 0);
        s.finish().unwrap();
        assert_eq!(journal.count("quit"), 1);
        assert!(!s.browser().is_running());
    }
}
