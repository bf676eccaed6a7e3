// src/ordering.rs

use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::MoveDirection;

/// Pozycja rodzeństwa w ręcznie ustalanej kolejności.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct OrderSlot {
    pub id: Uuid,
    pub order_key: i32,
}

/// Tabele z ręczną kolejnością. Przedmioty porządkowane są w obrębie kategorii.
#[derive(Debug, Clone, Copy)]
pub enum OrderedTable {
    Categories,
    Items { category_id: Uuid },
    WoodItems,
}

impl OrderedTable {
    fn table(&self) -> &'static str {
        match self {
            OrderedTable::Categories => "categories",
            OrderedTable::Items { .. } => "items",
            OrderedTable::WoodItems => "wood_items",
        }
    }

    fn key_column(&self) -> &'static str {
        match self {
            OrderedTable::Items { .. } => "belt_number",
            _ => "sort_order",
        }
    }
}

/// Wynik przesunięcia w ręcznie ustalanej kolejności.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved,
    /// Element jest już pierwszy albo ostatni.
    AtEdge,
    /// Sąsiad ma ten sam klucz, zamiana niczego by nie zmieniła.
    SameKey,
}

impl MoveOutcome {
    pub fn moved(self) -> bool {
        self == MoveOutcome::Moved
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapPlan {
    /// Przesuwany i sąsiad z nowymi kluczami.
    Swap(OrderSlot, OrderSlot),
    Skip(MoveOutcome),
}

/// Wyznacza parę do zamiany. `siblings` musi być posortowane tak jak na liście.
pub fn plan_swap(
    siblings: &[OrderSlot],
    id: Uuid,
    direction: MoveDirection,
) -> Result<SwapPlan, AppError> {
    let position = siblings
        .iter()
        .position(|slot| slot.id == id)
        .ok_or(AppError::NotFound)?;

    let neighbour = match direction {
        MoveDirection::Up if position > 0 => position - 1,
        MoveDirection::Down if position + 1 < siblings.len() => position + 1,
        _ => return Ok(SwapPlan::Skip(MoveOutcome::AtEdge)),
    };

    let moved = siblings[position];
    let other = siblings[neighbour];
    if moved.order_key == other.order_key {
        return Ok(SwapPlan::Skip(MoveOutcome::SameKey));
    }

    Ok(SwapPlan::Swap(
        OrderSlot {
            id: moved.id,
            order_key: other.order_key,
        },
        OrderSlot {
            id: other.id,
            order_key: moved.order_key,
        },
    ))
}

/// Zamienia klucz kolejności z sąsiadem w jednej transakcji.
pub async fn swap_with_neighbour(
    tx: &mut Transaction<'_, Postgres>,
    table: OrderedTable,
    id: Uuid,
    direction: MoveDirection,
) -> Result<MoveOutcome, AppError> {
    let select = match table {
        OrderedTable::Items { .. } => format!(
            "SELECT id, {key} AS order_key FROM {table} WHERE category_id = $1 ORDER BY {key} ASC, created_at ASC FOR UPDATE",
            key = table.key_column(),
            table = table.table()
        ),
        _ => format!(
            "SELECT id, {key} AS order_key FROM {table} ORDER BY {key} ASC, created_at ASC FOR UPDATE",
            key = table.key_column(),
            table = table.table()
        ),
    };

    let mut query = sqlx::query_as::<_, OrderSlot>(&select);
    if let OrderedTable::Items { category_id } = table {
        query = query.bind(category_id);
    }
    let siblings = query.fetch_all(&mut **tx).await?;

    let (moved, other) = match plan_swap(&siblings, id, direction)? {
        SwapPlan::Swap(moved, other) => (moved, other),
        SwapPlan::Skip(outcome) => {
            if outcome == MoveOutcome::SameKey {
                tracing::warn!(
                    "Nie przesunięto {} w {}: sąsiad ma ten sam klucz kolejności",
                    id,
                    table.table()
                );
            }
            return Ok(outcome);
        }
    };

    let update = format!(
        "UPDATE {} SET {} = $1, updated_at = NOW() WHERE id = $2",
        table.table(),
        table.key_column()
    );
    for slot in [moved, other] {
        sqlx::query(&update)
            .bind(slot.order_key)
            .bind(slot.id)
            .execute(&mut **tx)
            .await?;
    }

    tracing::info!(
        "Zamieniono kolejność w {}: {} <-> {}",
        table.table(),
        moved.id,
        other.id
    );
    Ok(MoveOutcome::Moved)
}

/// Następny wolny klucz kolejności (max + 1).
pub async fn next_order_key(
    tx: &mut Transaction<'_, Postgres>,
    table: OrderedTable,
) -> Result<i32, AppError> {
    let sql = match table {
        OrderedTable::Items { .. } => format!(
            "SELECT COALESCE(MAX({}), 0) + 1 FROM {} WHERE category_id = $1",
            table.key_column(),
            table.table()
        ),
        _ => format!(
            "SELECT COALESCE(MAX({}), -1) + 1 FROM {}",
            table.key_column(),
            table.table()
        ),
    };
    let mut query = sqlx::query_scalar::<_, i32>(&sql);
    if let OrderedTable::Items { category_id } = table {
        query = query.bind(category_id);
    }
    Ok(query.fetch_one(&mut **tx).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slots(keys: &[i32]) -> Vec<OrderSlot> {
        keys.iter()
            .map(|&order_key| OrderSlot {
                id: Uuid::new_v4(),
                order_key,
            })
            .collect()
    }

    fn swap_pair(plan: SwapPlan) -> (OrderSlot, OrderSlot) {
        match plan {
            SwapPlan::Swap(moved, other) => (moved, other),
            SwapPlan::Skip(outcome) => panic!("oczekiwano zamiany, otrzymano {:?}", outcome),
        }
    }

    fn apply(siblings: &mut [OrderSlot], pair: (OrderSlot, OrderSlot)) {
        for slot in siblings.iter_mut() {
            if slot.id == pair.0.id {
                slot.order_key = pair.0.order_key;
            } else if slot.id == pair.1.id {
                slot.order_key = pair.1.order_key;
            }
        }
    }

    #[test]
    fn moving_up_swaps_exactly_two_keys() {
        let mut siblings = slots(&[0, 3, 7, 9]);
        let before = siblings.clone();
        let pair = swap_pair(plan_swap(&siblings, siblings[2].id, MoveDirection::Up).unwrap());
        apply(&mut siblings, pair);

        assert_eq!(siblings[2].order_key, 3);
        assert_eq!(siblings[1].order_key, 7);
        assert_eq!(siblings[0], before[0]);
        assert_eq!(siblings[3], before[3]);
    }

    #[test]
    fn moving_down_swaps_with_next() {
        let siblings = slots(&[1, 2, 3]);
        let (moved, other) =
            swap_pair(plan_swap(&siblings, siblings[0].id, MoveDirection::Down).unwrap());
        assert_eq!(moved.id, siblings[0].id);
        assert_eq!(moved.order_key, 2);
        assert_eq!(other.id, siblings[1].id);
        assert_eq!(other.order_key, 1);
    }

    #[test]
    fn edges_are_noops() {
        let siblings = slots(&[1, 2]);
        assert_eq!(
            plan_swap(&siblings, siblings[0].id, MoveDirection::Up).unwrap(),
            SwapPlan::Skip(MoveOutcome::AtEdge)
        );
        assert_eq!(
            plan_swap(&siblings, siblings[1].id, MoveDirection::Down).unwrap(),
            SwapPlan::Skip(MoveOutcome::AtEdge)
        );
    }

    #[test]
    fn equal_keys_are_reported_instead_of_swapped() {
        let siblings = slots(&[0, 0, 4]);
        let outcome = plan_swap(&siblings, siblings[1].id, MoveDirection::Up).unwrap();
        assert_eq!(outcome, SwapPlan::Skip(MoveOutcome::SameKey));
        assert!(!MoveOutcome::SameKey.moved());

        // z innym sąsiadem zamiana nadal działa
        let (moved, other) =
            swap_pair(plan_swap(&siblings, siblings[1].id, MoveDirection::Down).unwrap());
        assert_eq!(moved.order_key, 4);
        assert_eq!(other.order_key, 0);
    }

    #[test]
    fn unknown_id_is_not_found() {
        let siblings = slots(&[1, 2]);
        let result = plan_swap(&siblings, Uuid::new_v4(), MoveDirection::Up);
        assert!(matches!(result, Err(AppError::NotFound)));
    }
}
