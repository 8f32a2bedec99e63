//! Query engine (C5): `query_by_space`, `query_by_type`, `query_by_time`,
//! sharing the cursor/limit/order contract from spec.md §4.5.

use rblogs_contracts::{
    error::RblogsResult,
    event::{Event, EventType},
    query::{CursorPosition, Order, PaginatedResult, QueryOptions, MAX_LIMIT},
};

use crate::engine::Engine;

impl Engine {
    /// Page through one space's events in `(sequence_number, id)` order.
    /// Backed directly by `RecordStore::scan_events_by_space`, which is
    /// already indexed for this access pattern.
    pub async fn query_by_space(
        &self,
        space_id: &str,
        opts: &QueryOptions,
    ) -> RblogsResult<PaginatedResult<Event>> {
        let limit = opts.clamped_limit(MAX_LIMIT) as usize;
        let order = opts.order();
        let cursor_seq = match &opts.cursor {
            Some(c) => Some(CursorPosition::decode(c)?.sequence_number),
            None => None,
        };

        let mut items = self
            .store
            .scan_events_by_space(space_id, cursor_seq, order, limit + 1)
            .await?;
        let total = self.store.count_events_in_space(space_id).await?;

        let next_cursor = take_overflow_row(&mut items, limit);
        Ok(PaginatedResult {
            items,
            next_cursor,
            total,
        })
    }

    /// Page through every event of `event_type`, across all spaces.
    /// `RecordStore::scan_events_by_type` returns its matches unordered;
    /// ordering, cursor resumption, and the limit are applied here.
    pub async fn query_by_type(
        &self,
        event_type: EventType,
        opts: &QueryOptions,
    ) -> RblogsResult<PaginatedResult<Event>> {
        let total = self.store.count_events_by_type(event_type).await?;
        let unordered = self.store.scan_events_by_type(event_type).await?;
        self.paginate_in_memory(unordered, opts, total)
    }

    /// Page through every event with `timestamp` in `[from, to)`, across
    /// all spaces. Ties resolve on `(sequence_number, id)` (Open Question
    /// resolution, see DESIGN.md).
    pub async fn query_by_time(
        &self,
        from: &str,
        to: &str,
        opts: &QueryOptions,
    ) -> RblogsResult<PaginatedResult<Event>> {
        let total = self.store.count_events_by_time(from, to).await?;
        let unordered = self.store.scan_events_by_time(from, to).await?;
        self.paginate_in_memory(unordered, opts, total)
    }

    fn paginate_in_memory(
        &self,
        mut items: Vec<Event>,
        opts: &QueryOptions,
        total: u64,
    ) -> RblogsResult<PaginatedResult<Event>> {
        let limit = opts.clamped_limit(MAX_LIMIT) as usize;
        let order = opts.order();
        let cursor = match &opts.cursor {
            Some(c) => Some(CursorPosition::decode(c)?),
            None => None,
        };

        items.sort_by(|a, b| {
            let key_a = (a.sequence_number, &a.id);
            let key_b = (b.sequence_number, &b.id);
            match order {
                Order::Asc => key_a.cmp(&key_b),
                Order::Desc => key_b.cmp(&key_a),
            }
        });

        if let Some(pos) = &cursor {
            items.retain(|e| {
                let key = (e.sequence_number, e.id.as_str());
                let pos_key = (pos.sequence_number, pos.id.as_str());
                match order {
                    Order::Asc => key > pos_key,
                    Order::Desc => key < pos_key,
                }
            });
        }

        items.truncate(limit + 1);
        let next_cursor = take_overflow_row(&mut items, limit);
        Ok(PaginatedResult {
            items,
            next_cursor,
            total,
        })
    }
}

/// If `items` holds more than `limit` rows (the `limit + 1` overflow-row
/// trick), drop the overflow row and return a cursor encoding the
/// position of the new last item; otherwise leave `items` untouched and
/// return `None`.
fn take_overflow_row(items: &mut Vec<Event>, limit: usize) -> Option<String> {
    if items.len() > limit {
        items.truncate(limit);
        items.last().map(|e| {
            CursorPosition {
                sequence_number: e.sequence_number,
                id: e.id.clone(),
            }
            .encode()
        })
    } else {
        None
    }
}
