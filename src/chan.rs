// gcsr converts binary edge lists into compressed sparse row graphs
// Copyright (C) 2022 Jacob Konrad
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! A fixed-capacity blocking queue with a one-shot close.
//!
//! ```
//! use gcsr_core::chan::BoundedChannel;
//!
//! let chan = BoundedChannel::new(2);
//! chan.push(1).unwrap();
//! chan.push(2).unwrap();
//! chan.close();
//!
//! assert!(chan.push(3).is_err());
//! assert_eq!(vec![1, 2], chan.iter().collect::<Vec<_>>());
//! assert_eq!(None, chan.pop());
//! ```

use std::{collections::VecDeque, fmt};

use parking_lot::{Condvar, Mutex};

/// Returned by [`BoundedChannel::push`] once the channel is closed, handing
/// the rejected item back.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Closed<T>(pub T);

impl<T> fmt::Debug for Closed<T>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "Closed(..)")
    }
}

impl<T> fmt::Display for Closed<T>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "push on a closed channel")
    }
}

impl<T> std::error::Error for Closed<T> {}

struct State<T>
{
    queue: VecDeque<T>,
    closed: bool,
}

/// Open until [`close`](BoundedChannel::close) is called. After that pushes
/// are rejected while pops keep draining the buffered items, and once the
/// buffer is empty every pop returns `None` without blocking.
pub struct BoundedChannel<T>
{
    state: Mutex<State<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
}

impl<T> BoundedChannel<T>
{
    /// A channel holding at most `capacity` items, and at least one.
    pub fn new(capacity: usize) -> Self
    {
        let capacity = std::cmp::max(capacity, 1);
        Self {
            state: Mutex::new(State {
                queue: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize
    {
        self.capacity
    }

    /// Number of buffered items.
    pub fn len(&self) -> usize
    {
        self.state.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool
    {
        self.state.lock().closed
    }

    /// Append `item`, blocking while the channel is full.
    ///
    /// A push that is blocked when the channel gets closed is woken and
    /// rejected like any later push.
    pub fn push(&self, item: T) -> Result<(), Closed<T>>
    {
        let mut state = self.state.lock();
        loop {
            if state.closed {
                return Err(Closed(item));
            }
            if state.queue.len() < self.capacity {
                break;
            }
            self.not_full.wait(&mut state);
        }
        state.queue.push_back(item);
        drop(state);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Take the oldest item, blocking while the channel is empty and open.
    ///
    /// `None` means the channel is closed and drained.
    pub fn pop(&self) -> Option<T>
    {
        let mut state = self.state.lock();
        loop {
            if let Some(item) = state.queue.pop_front() {
                drop(state);
                self.not_full.notify_one();
                return Some(item);
            }
            if state.closed {
                return None;
            }
            self.not_empty.wait(&mut state);
        }
    }

    /// Stop accepting pushes. Calling it again has no effect.
    pub fn close(&self)
    {
        let mut state = self.state.lock();
        if !state.closed {
            state.closed = true;
            drop(state);
            self.not_empty.notify_all();
            self.not_full.notify_all();
        }
    }

    /// Pop until end-of-stream.
    pub fn iter(&self) -> Iter<'_, T>
    {
        Iter { chan: self }
    }
}

pub struct Iter<'a, T>
{
    chan: &'a BoundedChannel<T>,
}

impl<'a, T> Iterator for Iter<'a, T>
{
    type Item = T;

    fn next(&mut self) -> Option<T>
    {
        self.chan.pop()
    }
}

impl<'a, T> IntoIterator for &'a BoundedChannel<T>
{
    type Item = T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T>
    {
        self.iter()
    }
}
