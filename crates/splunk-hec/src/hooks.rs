// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Before/after send notifications.
//!
//! Hooks run synchronously on the task that called `send`/`health_check`, in
//! registration order. A hook returning an error aborts the call.

use std::fmt;
use std::sync::Arc;

use crate::error::HecError;
use crate::request::Request;
use crate::response::Response;

/// Error returned by a hook to abort the current call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookError(pub String);

impl fmt::Display for HookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for HookError {}

impl From<&str> for HookError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}

impl From<String> for HookError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

/// Called with the request after field overrides, right before it is sent.
pub type BeforeSendHook = Arc<dyn Fn(&Request) -> Result<(), HookError> + Send + Sync>;

/// Called with the decoded response before it is returned to the caller.
pub type AfterSendHook = Arc<dyn Fn(&Response) -> Result<(), HookError> + Send + Sync>;

#[derive(Clone, Default)]
pub(crate) struct Hooks {
    before_send: Vec<BeforeSendHook>,
    after_send: Vec<AfterSendHook>,
}

impl Hooks {
    pub(crate) fn add_before_send(&mut self, hook: BeforeSendHook) {
        self.before_send.push(hook);
    }

    pub(crate) fn add_after_send(&mut self, hook: AfterSendHook) {
        self.after_send.push(hook);
    }

    pub(crate) fn fire_before_send(&self, request: &Request) -> Result<(), HecError> {
        for hook in &self.before_send {
            hook(request).map_err(|e| HecError::Hook(e.0))?;
        }
        Ok(())
    }

    pub(crate) fn fire_after_send(&self, response: &Response) -> Result<(), HecError> {
        for hook in &self.after_send {
            hook(response).map_err(|e| HecError::Hook(e.0))?;
        }
        Ok(())
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("before_send", &self.before_send.len())
            .field("after_send", &self.after_send.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn hooks_fire_in_registration_order() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut hooks = Hooks::default();
        for name in ["first", "second"] {
            let calls = Arc::clone(&calls);
            hooks.add_before_send(Arc::new(move |_: &Request| -> Result<(), HookError> {
                calls.lock().unwrap().push(name);
                Ok(())
            }));
        }

        hooks.fire_before_send(&Request::new()).unwrap();
        assert_eq!(*calls.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn failing_hook_stops_later_hooks() {
        let reached = Arc::new(Mutex::new(false));
        let mut hooks = Hooks::default();
        hooks.add_after_send(Arc::new(|_: &Response| -> Result<(), HookError> {
            Err("rejected".into())
        }));
        let flag = Arc::clone(&reached);
        hooks.add_after_send(Arc::new(move |_: &Response| -> Result<(), HookError> {
            *flag.lock().unwrap() = true;
            Ok(())
        }));

        let err = hooks.fire_after_send(&Response::default()).unwrap_err();
        assert_eq!(err.to_string(), "send hook failed: rejected");
        assert!(!*reached.lock().unwrap());
    }

    #[test]
    fn no_hooks_is_a_no_op() {
        let hooks = Hooks::default();
        assert!(hooks.fire_before_send(&Request::new()).is_ok());
        assert!(hooks.fire_after_send(&Response::default()).is_ok());
        assert_eq!(format!("{hooks:?}"), "Hooks { before_send: 0, after_send: 0 }");
    }
}
