//! The insertion-cost scheduler (spec §4.6): given a car's current position and its
//! existing stop queue, decide where a new `(src, dst)` call fits while preserving
//! the "direction changes only at queue entries" invariant.

use elevator_proto::floor::Direction;

/// Where a new pickup/drop-off pair would land in an existing queue, and how
/// expensive that placement is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Insertion {
    /// Index into the original queue at which `src` sits or is inserted.
    pub pickup_index: usize,
    /// Index (into the queue *before* insertion) at which `dst` is inserted, counted
    /// as if `src` had not yet been inserted — i.e. this is the position among the
    /// original entries, not shifted for the pickup.
    pub dropoff_index: usize,
    /// `true` if `src` already appears immediately adjacent to where the pickup
    /// would land, in which case the existing entry serves the call and `src` is
    /// not inserted again — otherwise two consecutive queue entries would be equal,
    /// which spec §3 forbids.
    pub src_already_queued: bool,
    /// `true` if `dst` already appears in the original queue, in which case only
    /// `src` is actually inserted (spec §4.6: "skip the dst insertion if dst already
    /// appears in the queue").
    pub dst_already_queued: bool,
}

impl Insertion {
    /// Primary sort key: lower pickup index is serviced sooner.
    pub fn cost(&self) -> usize {
        self.pickup_index
    }

    /// Secondary sort key (tie-break): the queue length after committing this
    /// insertion.
    pub fn final_queue_len(&self, original_len: usize) -> usize {
        let added = usize::from(!self.src_already_queued) + usize::from(!self.dst_already_queued);
        original_len + added
    }

    /// Commits this insertion into `queue` in place.
    pub fn apply(&self, queue: &mut Vec<i32>, src: i32, dst: i32) {
        // The dropoff_index is expressed in terms of the pre-pickup array; once src
        // is inserted at pickup_index, any dropoff position at or after it shifts by one.
        let shifted_dropoff = if !self.src_already_queued && self.dropoff_index >= self.pickup_index
        {
            self.dropoff_index + 1
        } else {
            self.dropoff_index
        };
        if !self.src_already_queued {
            queue.insert(self.pickup_index, src);
        }
        if !self.dst_already_queued {
            queue.insert(shifted_dropoff, dst);
        }
    }
}

/// `true` if `src` already sits at `queue[index - 1]`, i.e. the would-be pickup slot
/// is immediately preceded by an entry equal to `src` (spec §3: no two consecutive
/// queue entries may be equal).
fn pickup_already_queued(queue: &[i32], index: usize, src: i32) -> bool {
    index > 0 && queue[index - 1] == src
}

/// One synthetic travel leg used while searching for an insertion point: `(start,
/// end, insert_index)`. `insert_index` is where a pickup strictly inside `(start,
/// end)` would be inserted into the queue.
struct Segment {
    start: i32,
    end: Bound,
    insert_index: usize,
}

#[derive(Clone, Copy)]
enum Bound {
    Floor(i32),
    PosInf,
    NegInf,
}

fn direction_of(start: i32, end: i32) -> Direction {
    match (end - start).signum() {
        1 => Direction::Up,
        -1 => Direction::Down,
        _ => Direction::Idle,
    }
}

/// Builds the segment list: `(current, q[0])`, `(q[0], q[1])`, ..., and a final
/// unbounded segment continuing the last established direction past the tail of the
/// queue — spec §4.6/§9's "second strategy" of extending the current direction
/// before the next reversal. (Open question: the distilled spec describes this last
/// segment as `(q[n-1], current)`; read literally that endpoint points backwards and
/// cannot define a forward direction, so this implementation instead projects the
/// queue's last established direction to infinity, which is what "extends the
/// current direction" means for an elevator that hasn't reversed yet. See DESIGN.md.)
fn build_segments(current: i32, queue: &[i32]) -> Vec<Segment> {
    let mut segments = Vec::with_capacity(queue.len() + 1);
    if queue.is_empty() {
        return segments;
    }

    segments.push(Segment {
        start: current,
        end: Bound::Floor(queue[0]),
        insert_index: 0,
    });
    for i in 1..queue.len() {
        segments.push(Segment {
            start: queue[i - 1],
            end: Bound::Floor(queue[i]),
            insert_index: i,
        });
    }

    let last_leg_start = if queue.len() >= 2 {
        queue[queue.len() - 2]
    } else {
        current
    };
    let tail = *queue.last().unwrap();
    let tail_dir = direction_of(last_leg_start, tail);
    let end = match tail_dir {
        Direction::Up => Bound::PosInf,
        Direction::Down => Bound::NegInf,
        Direction::Idle => Bound::Floor(tail),
    };
    segments.push(Segment {
        start: tail,
        end,
        insert_index: queue.len(),
    });

    segments
}

/// `true` if `src` lies strictly inside `(start, end)` in the direction `dir`
/// (spec §4.6: "up means current ≤ src < next, down means current ≥ src > next").
fn contains_strictly(start: i32, end: Bound, dir: Direction, src: i32) -> bool {
    match (dir, end) {
        (Direction::Up, Bound::Floor(end)) => start <= src && src < end,
        (Direction::Up, Bound::PosInf) => start <= src,
        (Direction::Down, Bound::Floor(end)) => start >= src && src > end,
        (Direction::Down, Bound::NegInf) => start >= src,
        _ => false,
    }
}

/// Computes the cheapest valid insertion of `(src, dst)` into `queue`, or `None` if
/// no placement preserves direction monotonicity anywhere (spec §4.6's "cars whose
/// insertion cost is negative are skipped" — here, no insertion at all).
pub fn compute_insertion(current: i32, queue: &[i32], src: i32, dst: i32) -> Option<Insertion> {
    let request_dir = direction_of(src, dst);
    if request_dir == Direction::Idle {
        // A call to the floor the car already occupies; nothing to route.
        return None;
    }

    let segments = build_segments(current, queue);
    let pickup_index = segments.iter().find_map(|seg| {
        let dir = match seg.end {
            Bound::Floor(end) => direction_of(seg.start, end),
            Bound::PosInf => Direction::Up,
            Bound::NegInf => Direction::Down,
        };
        if dir == request_dir && contains_strictly(seg.start, seg.end, request_dir, src) {
            Some(seg.insert_index)
        } else {
            None
        }
    });

    let pickup_index = match pickup_index {
        Some(i) => i,
        None => return append_to_end(queue, src, dst),
    };

    let src_already_queued = pickup_already_queued(queue, pickup_index, src);
    let pickup_index = if src_already_queued {
        pickup_index - 1
    } else {
        pickup_index
    };

    let dst_already_queued = queue.contains(&dst);
    let dropoff_index = (pickup_index..queue.len())
        .find(|&m| match request_dir {
            Direction::Up => queue[m] >= dst,
            Direction::Down => queue[m] <= dst,
            Direction::Idle => unreachable!(),
        })
        .unwrap_or(queue.len());

    Some(Insertion {
        pickup_index,
        dropoff_index,
        src_already_queued,
        dst_already_queued,
    })
}

fn append_to_end(queue: &[i32], src: i32, dst: i32) -> Option<Insertion> {
    let pickup_index = queue.len();
    let src_already_queued = pickup_already_queued(queue, pickup_index, src);
    let pickup_index = if src_already_queued {
        pickup_index - 1
    } else {
        pickup_index
    };
    Some(Insertion {
        pickup_index,
        dropoff_index: queue.len(),
        src_already_queued,
        dst_already_queued: queue.contains(&dst),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_route_insertion_preserves_direction() {
        // queue [3,7], current 1, going up. CALL 5 6 -> [3,5,6,7].
        let queue = vec![3, 7];
        let ins = compute_insertion(1, &queue, 5, 6).unwrap();
        let mut q = queue.clone();
        ins.apply(&mut q, 5, 6);
        assert_eq!(q, vec![3, 5, 6, 7]);
        assert_eq!(ins.cost(), 1);
    }

    #[test]
    fn opposite_direction_appends() {
        // queue [3,5,6,7], CALL 8 2 (down) appends.
        let queue = vec![3, 5, 6, 7];
        let ins = compute_insertion(1, &queue, 8, 2).unwrap();
        let mut q = queue.clone();
        ins.apply(&mut q, 8, 2);
        assert_eq!(q, vec![3, 5, 6, 7, 8, 2]);
    }

    #[test]
    fn empty_queue_appends_both() {
        let ins = compute_insertion(1, &[], 3, 5).unwrap();
        let mut q = Vec::new();
        ins.apply(&mut q, 3, 5);
        assert_eq!(q, vec![3, 5]);
    }

    #[test]
    fn duplicate_destination_is_not_reinserted() {
        // queue [3,5], current 1 up, CALL 4 5 -> pickup 4 in route, dst 5 already queued.
        let queue = vec![3, 5];
        let ins = compute_insertion(1, &queue, 4, 5).unwrap();
        assert!(ins.dst_already_queued);
        let mut q = queue.clone();
        ins.apply(&mut q, 4, 5);
        assert_eq!(q, vec![3, 4, 5]);
    }

    #[test]
    fn duplicate_pickup_is_not_reinserted() {
        // queue [3,5], current 3 up, CALL 3 4 -> src 3 coincides with the queue's
        // own head; the existing entry serves the pickup instead of duplicating it.
        let queue = vec![3, 5];
        let ins = compute_insertion(3, &queue, 3, 4).unwrap();
        assert!(ins.src_already_queued);
        let mut q = queue.clone();
        ins.apply(&mut q, 3, 4);
        assert_eq!(q, vec![3, 4, 5]);
    }

    #[test]
    fn duplicate_pickup_at_tail_is_not_reinserted() {
        // queue [3,5] heading up, opposite-direction CALL 5 2 appends past the tail;
        // src 5 coincides with the existing tail entry and must not be duplicated.
        let queue = vec![3, 5];
        let ins = compute_insertion(1, &queue, 5, 2).unwrap();
        assert!(ins.src_already_queued);
        let mut q = queue.clone();
        ins.apply(&mut q, 5, 2);
        assert_eq!(q, vec![3, 5, 2]);
    }

    #[test]
    fn idle_request_has_no_insertion() {
        assert!(compute_insertion(1, &[3, 7], 5, 5).is_none());
    }

    #[test]
    fn continues_direction_past_tail_before_reversal() {
        // queue [3,5], last leg direction up (3->5). CALL 6 8 continues up past the tail.
        let queue = vec![3, 5];
        let ins = compute_insertion(1, &queue, 6, 8).unwrap();
        assert_eq!(ins.pickup_index, 2);
        let mut q = queue.clone();
        ins.apply(&mut q, 6, 8);
        assert_eq!(q, vec![3, 5, 6, 8]);
    }
}
