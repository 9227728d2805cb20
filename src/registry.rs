use std::collections::VecDeque;

use crate::classify::PanelHeading;
use crate::types::PanelDescriptor;

/// Panels declared in one document, in first-seen order.
///
/// Built during the first scan and frozen with [`PanelRegistry::cursor`] or
/// [`PanelRegistry::queue`] before person lines are assigned. The cursor hands
/// out panels strictly by position; the queue only hands out panels whose
/// declaration precedes the line asking for one.
#[derive(Debug, Default)]
pub struct PanelRegistry {
    panels: Vec<PanelDescriptor>,
}

impl PanelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a heading seen at `line_idx`. A label already registered is
    /// ignored so repeated banners don't create phantom panels.
    pub fn register(&mut self, heading: PanelHeading, line_idx: usize) -> bool {
        if self.panels.iter().any(|p| p.display_name == heading.display_name) {
            return false;
        }
        self.panels.push(PanelDescriptor {
            code: heading.code,
            display_name: heading.display_name,
            domain: heading.domain,
            declared_at: line_idx,
        });
        true
    }

    pub fn len(&self) -> usize {
        self.panels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.panels.is_empty()
    }

    /// Positional access: the i-th claim gets the i-th declared panel.
    pub fn cursor(&self) -> PanelCursor<'_> {
        PanelCursor { panels: &self.panels, next: 0 }
    }

    /// FIFO access in declaration order.
    pub fn queue(&self) -> PanelQueue<'_> {
        PanelQueue { pending: self.panels.iter().collect(), current: None }
    }
}

/// Index-counter over the registry (chair lists).
#[derive(Debug)]
pub struct PanelCursor<'a> {
    panels: &'a [PanelDescriptor],
    next: usize,
}

impl<'a> PanelCursor<'a> {
    /// Claim the next unclaimed panel, or `None` when all are taken.
    pub fn claim_next(&mut self) -> Option<&'a PanelDescriptor> {
        let panel = self.panels.get(self.next)?;
        self.next += 1;
        Some(panel)
    }

    pub fn remaining(&self) -> usize {
        self.panels.len() - self.next
    }
}

/// First-in-first-out queue over the registry (member lists).
#[derive(Debug)]
pub struct PanelQueue<'a> {
    pending: VecDeque<&'a PanelDescriptor>,
    current: Option<&'a PanelDescriptor>,
}

impl<'a> PanelQueue<'a> {
    /// Pop the oldest pending panel declared before `line_idx` and make it
    /// current. Returns `None` when nothing has been declared yet.
    pub fn dequeue_declared_before(&mut self, line_idx: usize) -> Option<&'a PanelDescriptor> {
        let front = self.pending.front()?;
        if front.declared_at >= line_idx {
            return None;
        }
        let panel = self.pending.pop_front()?;
        self.current = Some(panel);
        Some(panel)
    }

    /// Claim every pending panel declared before `line_idx`; the latest one
    /// becomes current. Used when no chair line marks panel boundaries.
    pub fn catch_up(&mut self, line_idx: usize) -> Option<&'a PanelDescriptor> {
        while self.dequeue_declared_before(line_idx).is_some() {}
        self.current
    }

    /// The panel most recently claimed.
    pub fn current(&self) -> Option<&'a PanelDescriptor> {
        self.current
    }

    /// Forget the current panel so following members are not attached to a
    /// panel whose chair was dropped.
    pub fn reset_current(&mut self) {
        self.current = None;
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Domain;

    fn heading(code: &str, name: &str) -> PanelHeading {
        PanelHeading {
            code: code.into(),
            display_name: format!("{name} ({code})"),
            domain: Domain::from_code(code).unwrap(),
        }
    }

    fn registry() -> PanelRegistry {
        let mut reg = PanelRegistry::new();
        reg.register(heading("PE1", "Mathematics"), 1);
        reg.register(heading("PE2", "Physics"), 2);
        reg.register(heading("PE3", "Condensed Matter"), 10);
        reg
    }

    #[test]
    fn duplicate_labels_are_ignored() {
        let mut reg = registry();
        assert!(!reg.register(heading("PE1", "Mathematics"), 20));
        assert_eq!(reg.len(), 3);
    }

    #[test]
    fn cursor_claims_by_position_until_exhausted() {
        let reg = registry();
        let mut cursor = reg.cursor();
        let codes: Vec<&str> = std::iter::from_fn(|| cursor.claim_next())
            .map(|p| p.code.as_str())
            .collect();
        assert_eq!(codes, vec!["PE1", "PE2", "PE3"]);
        assert!(cursor.claim_next().is_none());
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn queue_refuses_panels_declared_later() {
        let reg = registry();
        let mut queue = reg.queue();
        assert!(queue.dequeue_declared_before(0).is_none());
        assert!(queue.current().is_none());

        assert_eq!(queue.dequeue_declared_before(3).unwrap().code, "PE1");
        assert_eq!(queue.dequeue_declared_before(4).unwrap().code, "PE2");
        // PE3 is declared at line 10.
        assert!(queue.dequeue_declared_before(5).is_none());
        assert_eq!(queue.current().unwrap().code, "PE2");
        assert_eq!(queue.dequeue_declared_before(11).unwrap().code, "PE3");
        assert_eq!(queue.remaining(), 0);
    }

    #[test]
    fn catch_up_lands_on_latest_declared() {
        let reg = registry();
        let mut queue = reg.queue();
        assert!(queue.catch_up(1).is_none());
        assert_eq!(queue.catch_up(5).unwrap().code, "PE2");
        assert_eq!(queue.remaining(), 1);
        queue.reset_current();
        assert!(queue.current().is_none());
    }
}
