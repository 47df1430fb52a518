#[cfg(test)]
mod tests {
    use crate::events::{AddCookieEvent, CallNotification, NotificationKind, PipelineError};
    use crate::types::{CallId, FlattenStrategy};

    #[test]
    fn test_add_cookie_event_creation() {
        let event = AddCookieEvent::new(7, FlattenStrategy::Concat);

        assert_eq!(event.sequence, 7);
        assert_eq!(event.selected, FlattenStrategy::Concat);
        assert!(event.timestamp > 0);
    }

    #[test]
    fn test_add_cookie_event_serialization() {
        let event = AddCookieEvent::new(3, FlattenStrategy::Exhaust);

        let json_result = serde_json::to_value(&event);
        assert!(json_result.is_ok());

        let json_value = json_result.unwrap();
        assert!(json_value.get("sequence").is_some());
        assert!(json_value.get("selected").is_some());
        assert!(json_value.get("timestamp").is_some());
    }

    #[test]
    fn test_notification_constructors_tag_the_right_call() {
        let started = CallNotification::started(CallId(4), FlattenStrategy::Merge);
        let completed = CallNotification::completed(CallId(4), FlattenStrategy::Merge);
        let abandoned = CallNotification::abandoned(CallId(2), FlattenStrategy::Switch);

        assert_eq!(started.kind.call_id(), Some(CallId(4)));
        assert_eq!(completed.kind.call_id(), Some(CallId(4)));
        assert_eq!(abandoned.kind.call_id(), Some(CallId(2)));
        assert_eq!(abandoned.strategy, FlattenStrategy::Switch);
    }

    #[test]
    fn test_dropped_event_notification_has_no_call_id() {
        let dropped = CallNotification::event_dropped(9, FlattenStrategy::Exhaust);

        assert_eq!(dropped.kind.call_id(), None);
        assert_eq!(
            dropped.kind,
            NotificationKind::EventDropped { sequence: 9 }
        );
    }

    #[test]
    fn test_notification_display_formats() {
        let started = CallNotification::started(CallId(1), FlattenStrategy::Switch);
        let dropped = CallNotification::event_dropped(5, FlattenStrategy::Exhaust);

        assert_eq!(format!("{}", started), "call 1 started [switch]");
        assert_eq!(format!("{}", dropped), "event 5 dropped [exhaust]");
    }

    #[test]
    fn test_notification_round_trips_through_json() {
        let original = CallNotification::completed(CallId(11), FlattenStrategy::Concat);

        let encoded = serde_json::to_string(&original).unwrap();
        let decoded: CallNotification = serde_json::from_str(&encoded).unwrap();

        assert_eq!(decoded, original);
    }

    #[test]
    fn test_pipeline_error_messages() {
        let bus = PipelineError::BusClosed("no subscribers".to_string());
        let selection = PipelineError::SelectionClosed("sender dropped".to_string());

        assert_eq!(format!("{}", bus), "Event bus closed: no subscribers");
        assert_eq!(
            format!("{}", selection),
            "Selection channel closed: sender dropped"
        );
    }
}
