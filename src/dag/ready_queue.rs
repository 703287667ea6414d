// src/dag/ready_queue.rs

//! Jobs that are eligible to run, in dispatch order.

use std::collections::{BTreeMap, HashMap};

use crate::job::JobId;

/// Dispatch ordering key, compared lexicographically: lower priority value
/// first, then lower (earlier) submission sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OrderKey {
    pub priority: i32,
    pub sequence: u64,
}

/// Ordered set of eligible jobs. A job is present at most once.
#[derive(Debug, Default)]
pub struct ReadyQueue {
    order: BTreeMap<OrderKey, JobId>,
    keys: HashMap<JobId, OrderKey>,
}

impl ReadyQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `id` with `key`. Returns `false` (and changes nothing) if the
    /// job is already present.
    pub fn push(&mut self, id: JobId, key: OrderKey) -> bool {
        if self.keys.contains_key(&id) {
            return false;
        }
        self.keys.insert(id, key);
        self.order.insert(key, id);
        true
    }

    /// Remove the first job in dispatch order.
    pub fn pop(&mut self) -> Option<JobId> {
        let (_key, id) = self.order.pop_first()?;
        self.keys.remove(&id);
        Some(id)
    }

    /// Remove a specific job. Returns whether it was present.
    pub fn remove(&mut self, id: JobId) -> bool {
        match self.keys.remove(&id) {
            Some(key) => {
                self.order.remove(&key);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: JobId) -> bool {
        self.keys.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Jobs in dispatch order.
    pub fn iter(&self) -> impl Iterator<Item = (OrderKey, JobId)> + '_ {
        self.order.iter().map(|(k, id)| (*k, *id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::Job;

    fn key(priority: i32, sequence: u64) -> OrderKey {
        OrderKey { priority, sequence }
    }

    fn ids(n: usize) -> Vec<JobId> {
        (0..n).map(|_| Job::from_fn("t", || Ok(())).id()).collect()
    }

    #[test]
    fn equal_priorities_are_first_come_first_served() {
        let j = ids(4);
        let mut q = ReadyQueue::new();
        // A=5, B=1, C=5, D=1 submitted in that order.
        q.push(j[0], key(5, 0));
        q.push(j[1], key(1, 1));
        q.push(j[2], key(5, 2));
        q.push(j[3], key(1, 3));

        let order: Vec<_> = std::iter::from_fn(|| q.pop()).collect();
        assert_eq!(order, vec![j[1], j[3], j[0], j[2]]);
        assert!(q.is_empty());
    }

    #[test]
    fn negative_priorities_go_first() {
        let j = ids(2);
        let mut q = ReadyQueue::new();
        q.push(j[0], key(0, 0));
        q.push(j[1], key(-3, 1));
        assert_eq!(q.pop(), Some(j[1]));
    }

    #[test]
    fn job_is_present_at_most_once() {
        let j = ids(1);
        let mut q = ReadyQueue::new();
        assert!(q.push(j[0], key(1, 0)));
        assert!(!q.push(j[0], key(0, 5)));
        assert_eq!(q.len(), 1);
        assert_eq!(q.iter().next(), Some((key(1, 0), j[0])));
    }

    #[test]
    fn remove_takes_out_a_specific_job() {
        let j = ids(3);
        let mut q = ReadyQueue::new();
        for (i, id) in j.iter().enumerate() {
            q.push(*id, key(0, i as u64));
        }

        assert!(q.remove(j[1]));
        assert!(!q.remove(j[1]));
        assert!(!q.contains(j[1]));
        assert_eq!(q.pop(), Some(j[0]));
        assert_eq!(q.pop(), Some(j[2]));
        assert_eq!(q.pop(), None);
    }
}
