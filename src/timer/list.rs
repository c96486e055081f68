//! 桶容器：基于槽位存储的双向链表
//! Bucket container: doubly linked list over slot storage
//!
//! 同一量化期限的全部 handler 存放在一个 [`HandlerList`] 中。节点索引
//! 在列表存续期间保持稳定并被交给取消句柄，因此删除任意节点是 O(1)；
//! 每个节点带有 `seq` 印章，使过期句柄退化为可断言的未命中而非悬垂访问。
//!
//! All handlers of one quantized deadline live in a [`HandlerList`]. Node
//! indices stay stable for the list's lifetime and are handed out to
//! cancellation handles, so erasing any node is O(1); each node carries a
//! `seq` stamp that turns stale handles into assertable misses instead of
//! dangling accesses.

use crate::timer::actor::ActorRef;

/// Sentinel index for "no node".
pub(crate) const NIL: u32 = u32::MAX;

struct Entry {
    actor: Option<ActorRef>,
    prev: u32,
    next: u32,
    /// Bumped every time the slot is vacated; stale node references miss.
    /// 槽位每次腾空时递增；过期的节点引用将未命中。
    seq: u32,
}

/// Insertion-ordered handler list with O(1) push, pop and point-erase.
///
/// Handlers are pushed to the back and iterated (popped) from the front,
/// so firing order within a quantum is insertion order.
///
/// 保持插入顺序的 handler 列表，push、pop 与点删除均为 O(1)。
///
/// handler 从尾部压入、从头部弹出，因此同一量子内的触发顺序即插入顺序。
pub(crate) struct HandlerList {
    entries: Vec<Entry>,
    free_head: u32,
    head: u32,
    tail: u32,
    len: u32,
}

impl HandlerList {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            free_head: NIL,
            head: NIL,
            tail: NIL,
            len: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len as usize
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Appends a handler; returns its stable node index and seq stamp.
    /// 追加一个 handler；返回其稳定节点索引与 seq 印章。
    pub(crate) fn push_back(&mut self, actor: ActorRef) -> (u32, u32) {
        let node = if self.free_head != NIL {
            let node = self.free_head;
            self.free_head = self.entries[node as usize].next;
            node
        } else {
            self.entries.push(Entry {
                actor: None,
                prev: NIL,
                next: NIL,
                seq: 0,
            });
            (self.entries.len() - 1) as u32
        };

        let prev_tail = self.tail;
        let seq = {
            let entry = &mut self.entries[node as usize];
            debug_assert!(entry.actor.is_none());
            entry.actor = Some(actor);
            entry.prev = prev_tail;
            entry.next = NIL;
            entry.seq
        };
        if prev_tail != NIL {
            self.entries[prev_tail as usize].next = node;
        } else {
            self.head = node;
        }
        self.tail = node;
        self.len += 1;
        (node, seq)
    }

    /// Erases the node if it is still occupied under the given seq stamp.
    /// Returns the removed handler, or `None` on a stale reference.
    ///
    /// 若节点仍以给定 seq 印章占用则删除之。返回被移除的 handler，
    /// 引用过期时返回 `None`。
    pub(crate) fn remove(&mut self, node: u32, seq: u32) -> Option<ActorRef> {
        let idx = node as usize;
        if idx >= self.entries.len() {
            return None;
        }
        {
            let entry = &self.entries[idx];
            if entry.actor.is_none() || entry.seq != seq {
                return None;
            }
        }
        self.unlink(node);
        let entry = &mut self.entries[idx];
        let actor = entry.actor.take();
        entry.seq = entry.seq.wrapping_add(1);
        entry.prev = NIL;
        entry.next = self.free_head;
        self.free_head = node;
        self.len -= 1;
        actor
    }

    /// Pops the oldest handler, if any.
    /// 弹出最早的 handler（如有）。
    pub(crate) fn pop_front(&mut self) -> Option<ActorRef> {
        if self.head == NIL {
            return None;
        }
        let node = self.head;
        let seq = self.entries[node as usize].seq;
        self.remove(node, seq)
    }

    /// Drops all handlers and rebuilds the free chain, keeping capacity.
    /// 丢弃全部 handler 并重建空闲链，保留容量。
    pub(crate) fn clear(&mut self) {
        let count = self.entries.len();
        for (i, entry) in self.entries.iter_mut().enumerate() {
            if entry.actor.take().is_some() {
                entry.seq = entry.seq.wrapping_add(1);
            }
            entry.prev = NIL;
            entry.next = if i + 1 < count { (i + 1) as u32 } else { NIL };
        }
        self.free_head = if count > 0 { 0 } else { NIL };
        self.head = NIL;
        self.tail = NIL;
        self.len = 0;
    }

    /// Discards backing storage. Only valid on an empty list.
    /// 丢弃底层存储。仅对空列表有效。
    pub(crate) fn shrink(&mut self) {
        debug_assert!(self.is_empty());
        self.entries = Vec::new();
        self.free_head = NIL;
        self.head = NIL;
        self.tail = NIL;
    }

    fn unlink(&mut self, node: u32) {
        let (prev, next) = {
            let entry = &self.entries[node as usize];
            (entry.prev, entry.next)
        };
        if prev != NIL {
            self.entries[prev as usize].next = next;
        } else {
            self.head = next;
        }
        if next != NIL {
            self.entries[next as usize].prev = prev;
        } else {
            self.tail = prev;
        }
    }
}
