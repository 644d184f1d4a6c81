//! Invocation scope: begins an invocation and ends it when dropped
use crate::event::{Feature, Subject};
use crate::logger::Logger;

pub struct InvocationGuard<'a> {
    logger: &'a Logger,
    subject: Subject,
}

impl InvocationGuard<'_> {
    pub fn subject(&self) -> &Subject {
        &self.subject
    }
}

impl Drop for InvocationGuard<'_> {
    fn drop(&mut self) {
        self.logger.end_invocation(&self.subject);
    }
}

impl Logger {
    /// Allocates the next sample id of `function_name` and begins the invocation.
    /// The invocation ends, and the buffer is flushed, when the guard is dropped.
    pub fn invocation_scope(&self, function_name: &str, features: &[Feature]) -> InvocationGuard<'_> {
        let subject = self.next_subject(function_name);
        self.begin_invocation(&subject, features);
        InvocationGuard {
            logger: self,
            subject,
        }
    }
}
