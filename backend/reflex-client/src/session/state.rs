/// What the session knows about its binding to the page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Element whose content inbound updates replace. Set by the identity message.
    pub bound_element_id: Option<String>,
    /// Connection epoch the identity message arrived on.
    pub bound_epoch: Option<u64>,
}

impl SessionState {
    /// The first message of an epoch the session has not been bound on is the identity message.
    pub fn expects_identity(&self, epoch: u64) -> bool {
        self.bound_epoch != Some(epoch)
    }

    pub fn bind(&mut self, epoch: u64, element_id: String) {
        self.bound_element_id = Some(element_id);
        self.bound_epoch = Some(epoch);
    }
}
