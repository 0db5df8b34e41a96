use crate::model::RunEvent;

/// Highest event id consumed for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventCursor {
    run_id: String,
    last_event_id: u64,
}

impl EventCursor {
    pub fn new(run_id: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            last_event_id: 0,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Value for the `after_id` query parameter; `0` means "everything".
    pub fn last_event_id(&self) -> u64 {
        self.last_event_id
    }

    /// Point the cursor at another run. Switching runs starts over at `0`.
    pub fn retarget(&mut self, run_id: &str) {
        if self.run_id != run_id {
            self.run_id = run_id.to_string();
            self.last_event_id = 0;
        }
    }

    /// Keep only events newer than the cursor, in id order, and advance to
    /// the highest id in the batch.
    pub fn accept(&mut self, batch: Vec<RunEvent>) -> Vec<RunEvent> {
        let mut fresh: Vec<RunEvent> = batch
            .into_iter()
            .filter(|event| event.id > self.last_event_id)
            .collect();
        fresh.sort_by_key(|event| event.id);
        fresh.dedup_by_key(|event| event.id);
        if let Some(max) = fresh.last().map(|event| event.id) {
            self.last_event_id = max;
        }
        fresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events(ids: &[u64]) -> Vec<RunEvent> {
        ids.iter()
            .map(|id| RunEvent {
                id: *id,
                ..RunEvent::default()
            })
            .collect()
    }

    fn ids(events: &[RunEvent]) -> Vec<u64> {
        events.iter().map(|event| event.id).collect()
    }

    #[test]
    fn advances_to_max_id_not_last_element() {
        let mut cursor = EventCursor::new("run_1");
        let accepted = cursor.accept(events(&[3, 5, 4]));
        assert_eq!(ids(&accepted), vec![3, 4, 5]);
        assert_eq!(cursor.last_event_id(), 5);
    }

    #[test]
    fn overlap_and_duplicates_are_dropped() {
        let mut cursor = EventCursor::new("run_1");
        cursor.accept(events(&[1, 2]));
        let accepted = cursor.accept(events(&[2, 3, 3]));
        assert_eq!(ids(&accepted), vec![3]);
        assert_eq!(cursor.last_event_id(), 3);
    }

    #[test]
    fn empty_batch_keeps_position() {
        let mut cursor = EventCursor::new("run_1");
        cursor.accept(events(&[4]));
        assert!(cursor.accept(Vec::new()).is_empty());
        assert!(cursor.accept(events(&[1, 4])).is_empty());
        assert_eq!(cursor.last_event_id(), 4);
    }

    #[test]
    fn retarget_resets_only_for_a_different_run() {
        let mut cursor = EventCursor::new("run_1");
        cursor.accept(events(&[9]));
        cursor.retarget("run_1");
        assert_eq!(cursor.last_event_id(), 9);
        cursor.retarget("run_2");
        assert_eq!(cursor.run_id(), "run_2");
        assert_eq!(cursor.last_event_id(), 0);
    }
}
