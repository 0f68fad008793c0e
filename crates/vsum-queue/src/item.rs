//! Work items as handed out by a source.

/// One leased message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// Backend message id
    pub message_id: String,
    /// Handle needed to acknowledge this delivery (SQS receipt handle,
    /// stream entry id)
    pub receipt: String,
    /// Raw message body
    pub body: String,
    /// How many times the backend has delivered this message, if known
    pub receive_count: Option<u32>,
}

impl WorkItem {
    pub fn new(message_id: impl Into<String>, receipt: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            receipt: receipt.into(),
            body: body.into(),
            receive_count: None,
        }
    }

    /// True when the backend reports an earlier delivery of this message.
    pub fn is_redelivery(&self) -> bool {
        self.receive_count.map(|c| c > 1).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redelivery_flag() {
        let mut item = WorkItem::new("m1", "r1", "{}");
        assert!(!item.is_redelivery());
        item.receive_count = Some(1);
        assert!(!item.is_redelivery());
        item.receive_count = Some(2);
        assert!(item.is_redelivery());
    }
}
