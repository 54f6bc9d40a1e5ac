//! Console switch scanner - edges typed at the interactive prompt

use crossbeam::channel::{self, Receiver, Sender};

use super::{Edge, SwitchScanner};

/// Switch scanner fed by the console thread
pub struct ConsoleSwitches {
    rx: Receiver<Edge>,
}

impl ConsoleSwitches {
    /// Create the scanner and the sender the console writes edges into
    pub fn channel() -> (Sender<Edge>, Self) {
        let (tx, rx) = channel::unbounded();
        (tx, Self { rx })
    }
}

impl SwitchScanner for ConsoleSwitches {
    fn poll_edge(&mut self) -> Option<Edge> {
        self.rx.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edges_arrive_in_order() {
        let (tx, mut switches) = ConsoleSwitches::channel();

        tx.send(Edge::press(0)).unwrap();
        tx.send(Edge::release(0)).unwrap();

        assert_eq!(switches.poll_edge(), Some(Edge::press(0)));
        assert_eq!(switches.poll_edge(), Some(Edge::release(0)));
        assert_eq!(switches.poll_edge(), None);

        drop(tx);
        assert_eq!(switches.poll_edge(), None);
    }
}
