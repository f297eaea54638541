// Ordering of one user's cards. Used by both the board and the store.
// Orders within a column are dense: 0..n in display order.

use thiserror::Error;
use uuid::Uuid;

use crate::model::{Status, Todo};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderingError {
    #[error("invalid drop target: {target}")]
    InvalidTarget { target: String },

    #[error("unknown card: {id}")]
    UnknownCard { id: Uuid },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropTarget {
    // take that card's slot and push it down
    Todo(Uuid),
    // empty space of a column: append
    Column(Status),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropInstruction {
    pub dragged: Uuid,
    pub target: DropTarget,
}

impl DropInstruction {
    pub fn onto_todo(dragged: Uuid, target: Uuid) -> Self {
        Self {
            dragged,
            target: DropTarget::Todo(target),
        }
    }

    pub fn onto_column(dragged: Uuid, status: Status) -> Self {
        Self {
            dragged,
            target: DropTarget::Column(status),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub id: Uuid,
    pub status: Status,
    pub order: i64,
}

// Renumbering of the destination column, then of the source column when it differs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovePlan {
    pub moved: Placement,
    pub source: Status,
    pub placements: Vec<Placement>,
}

impl MovePlan {
    pub fn changes(&self, todos: &[Todo]) -> Vec<Placement> {
        changed_placements(todos, &self.placements)
    }

    pub fn apply(&self, todos: &mut [Todo]) {
        apply_placements(todos, &self.placements);
    }

    pub fn crosses_columns(&self) -> bool {
        self.source != self.moved.status
    }
}

// Column name from a request
pub fn parse_column(name: &str) -> Result<Status, OrderingError> {
    name.trim()
        .parse()
        .map_err(|_| OrderingError::InvalidTarget {
            target: name.to_string(),
        })
}

// Destination column and final index of a drop; None for a drop onto itself
pub fn resolve_drop(
    todos: &[Todo],
    instruction: &DropInstruction,
) -> Result<Option<(Status, usize)>, OrderingError> {
    let dragged = find(todos, instruction.dragged)?;

    match instruction.target {
        DropTarget::Todo(target_id) if target_id == dragged.id => Ok(None),
        DropTarget::Todo(target_id) => {
            let target = todos
                .iter()
                .find(|todo| todo.id == target_id)
                .ok_or_else(|| OrderingError::InvalidTarget {
                    target: target_id.to_string(),
                })?;
            let column = column_ids(todos, target.status, Some(dragged.id));
            let index = column
                .iter()
                .position(|id| *id == target_id)
                .ok_or_else(|| OrderingError::InvalidTarget {
                    target: target_id.to_string(),
                })?;
            Ok(Some((target.status, index)))
        }
        DropTarget::Column(status) => {
            let len = column_ids(todos, status, Some(dragged.id)).len();
            Ok(Some((status, len)))
        }
    }
}

pub fn plan_drop(
    todos: &[Todo],
    instruction: &DropInstruction,
) -> Result<Option<MovePlan>, OrderingError> {
    match resolve_drop(todos, instruction)? {
        Some((status, index)) => plan_move(todos, instruction.dragged, status, index),
        None => Ok(None),
    }
}

// `index` is the final position once the card has left its slot, clamped to
// the end of the column. None when nothing would change.
pub fn plan_move(
    todos: &[Todo],
    id: Uuid,
    status: Status,
    index: usize,
) -> Result<Option<MovePlan>, OrderingError> {
    let dragged = find(todos, id)?;

    let mut destination = column_ids(todos, status, Some(id));
    let index = index.min(destination.len());
    destination.insert(index, id);

    let mut placements = number(&destination, status);
    if dragged.status != status {
        let source = column_ids(todos, dragged.status, Some(id));
        placements.extend(number(&source, dragged.status));
    }

    if changed_placements(todos, &placements).is_empty() {
        return Ok(None);
    }

    Ok(Some(MovePlan {
        moved: Placement {
            id,
            status,
            order: to_order(index),
        },
        source: dragged.status,
        placements,
    }))
}

pub fn plan_removal(todos: &[Todo], id: Uuid) -> Result<Vec<Placement>, OrderingError> {
    let removed = find(todos, id)?;
    let survivors = column_ids(todos, removed.status, Some(id));
    Ok(number(&survivors, removed.status))
}

pub fn next_order(todos: &[Todo], status: Status) -> i64 {
    todos
        .iter()
        .filter(|todo| todo.status == status)
        .map(|todo| todo.order)
        .max()
        .map_or(0, |last| last + 1)
}

pub fn is_dense(todos: &[Todo]) -> bool {
    Status::ALL.iter().all(|status| {
        let mut orders: Vec<i64> = todos
            .iter()
            .filter(|todo| todo.status == *status)
            .map(|todo| todo.order)
            .collect();
        orders.sort_unstable();
        orders.iter().enumerate().all(|(i, order)| to_order(i) == *order)
    })
}

pub fn sort_board(todos: &mut [Todo]) {
    todos.sort_by(|a, b| (a.status, a.order, a.id).cmp(&(b.status, b.order, b.id)));
}

pub fn apply_placements(todos: &mut [Todo], placements: &[Placement]) {
    for placement in placements {
        if let Some(todo) = todos.iter_mut().find(|todo| todo.id == placement.id) {
            todo.status = placement.status;
            todo.order = placement.order;
        }
    }
    sort_board(todos);
}

pub fn changed_placements(todos: &[Todo], placements: &[Placement]) -> Vec<Placement> {
    placements
        .iter()
        .filter(|placement| {
            todos
                .iter()
                .find(|todo| todo.id == placement.id)
                .map_or(true, |todo| {
                    todo.status != placement.status || todo.order != placement.order
                })
        })
        .copied()
        .collect()
}

fn find(todos: &[Todo], id: Uuid) -> Result<&Todo, OrderingError> {
    todos
        .iter()
        .find(|todo| todo.id == id)
        .ok_or(OrderingError::UnknownCard { id })
}

// Ids of a column in display order. Ties (only possible after a lost write)
// fall back to creation time so the result stays deterministic.
fn column_ids(todos: &[Todo], status: Status, skip: Option<Uuid>) -> Vec<Uuid> {
    let mut column: Vec<&Todo> = todos
        .iter()
        .filter(|todo| todo.status == status && Some(todo.id) != skip)
        .collect();
    column.sort_by(|a, b| (a.order, a.created_at, a.id).cmp(&(b.order, b.created_at, b.id)));
    column.into_iter().map(|todo| todo.id).collect()
}

fn number(ids: &[Uuid], status: Status) -> Vec<Placement> {
    ids.iter()
        .enumerate()
        .map(|(index, id)| Placement {
            id: *id,
            status,
            order: to_order(index),
        })
        .collect()
}

fn to_order(index: usize) -> i64 {
    i64::try_from(index).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;
    use rstest::rstest;

    fn card(title: &str, status: Status, order: i64) -> Todo {
        let now = Utc::now();
        Todo {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            title: title.to_string(),
            description: String::new(),
            status,
            order,
            created_at: now,
            updated_at: now,
        }
    }

    fn titles(todos: &[Todo], status: Status) -> Vec<String> {
        let mut column: Vec<&Todo> = todos.iter().filter(|t| t.status == status).collect();
        column.sort_by_key(|t| t.order);
        column.iter().map(|t| t.title.clone()).collect()
    }

    fn id_of(todos: &[Todo], title: &str) -> Uuid {
        todos.iter().find(|t| t.title == title).unwrap().id
    }

    // todo: X Y Z, doing: P Q
    fn board() -> Vec<Todo> {
        vec![
            card("X", Status::Todo, 0),
            card("Y", Status::Todo, 1),
            card("Z", Status::Todo, 2),
            card("P", Status::Doing, 0),
            card("Q", Status::Doing, 1),
        ]
    }

    fn drop_and_apply(todos: &mut Vec<Todo>, instruction: DropInstruction) {
        let plan = plan_drop(todos, &instruction).unwrap().unwrap();
        plan.apply(todos);
    }

    #[test]
    fn test_drop_last_before_first() {
        let mut todos = board();
        let (z, x) = (id_of(&todos, "Z"), id_of(&todos, "X"));

        drop_and_apply(&mut todos, DropInstruction::onto_todo(z, x));

        assert_eq!(titles(&todos, Status::Todo), ["Z", "X", "Y"]);
        assert!(is_dense(&todos));
    }

    #[rstest]
    #[case("X", "Z", &["Y", "X", "Z"])]
    #[case("X", "Y", &["X", "Y", "Z"])]
    #[case("Y", "X", &["Y", "X", "Z"])]
    #[case("Z", "Y", &["X", "Z", "Y"])]
    fn test_drop_within_column(
        #[case] dragged: &str,
        #[case] target: &str,
        #[case] expected: &[&str],
    ) {
        let mut todos = board();
        let instruction =
            DropInstruction::onto_todo(id_of(&todos, dragged), id_of(&todos, target));

        if let Some(plan) = plan_drop(&todos, &instruction).unwrap() {
            plan.apply(&mut todos);
        }

        assert_eq!(titles(&todos, Status::Todo), expected);
        assert!(is_dense(&todos));
    }

    #[test]
    fn test_drop_across_columns_takes_target_slot() {
        let mut todos = board();
        let (y, q) = (id_of(&todos, "Y"), id_of(&todos, "Q"));
        let q_old = todos.iter().find(|t| t.id == q).unwrap().order;

        drop_and_apply(&mut todos, DropInstruction::onto_todo(y, q));

        let y_new = todos.iter().find(|t| t.id == y).unwrap();
        let q_new = todos.iter().find(|t| t.id == q).unwrap();
        assert_eq!(y_new.status, Status::Doing);
        assert_eq!(y_new.order, q_old);
        assert_eq!(q_new.order, q_old + 1);
        assert_eq!(titles(&todos, Status::Doing), ["P", "Y", "Q"]);
        assert_eq!(titles(&todos, Status::Todo), ["X", "Z"]);
        assert!(is_dense(&todos));
    }

    #[test]
    fn test_drop_on_empty_column_gets_order_zero() {
        let mut todos = board();
        let x = id_of(&todos, "X");

        drop_and_apply(&mut todos, DropInstruction::onto_column(x, Status::Done));

        let moved = todos.iter().find(|t| t.id == x).unwrap();
        assert_eq!((moved.status, moved.order), (Status::Done, 0));
        assert_eq!(titles(&todos, Status::Todo), ["Y", "Z"]);
    }

    #[test]
    fn test_drop_on_column_space_appends() {
        let mut todos = board();
        let x = id_of(&todos, "X");

        drop_and_apply(&mut todos, DropInstruction::onto_column(x, Status::Doing));
        assert_eq!(titles(&todos, Status::Doing), ["P", "Q", "X"]);

        // same column: goes to the bottom
        let y = id_of(&todos, "Y");
        drop_and_apply(&mut todos, DropInstruction::onto_column(y, Status::Todo));
        assert_eq!(titles(&todos, Status::Todo), ["Z", "Y"]);
        assert!(is_dense(&todos));
    }

    #[test]
    fn test_drop_onto_itself_is_noop() {
        let todos = board();
        let x = id_of(&todos, "X");
        assert_eq!(plan_drop(&todos, &DropInstruction::onto_todo(x, x)), Ok(None));
    }

    #[test]
    fn test_move_to_current_position_is_noop() {
        let todos = board();
        let y = id_of(&todos, "Y");
        assert_eq!(plan_move(&todos, y, Status::Todo, 1), Ok(None));

        let z = id_of(&todos, "Z");
        assert_eq!(
            plan_drop(&todos, &DropInstruction::onto_column(z, Status::Todo)),
            Ok(None)
        );
    }

    #[test]
    fn test_unknown_target_todo() {
        let todos = board();
        let x = id_of(&todos, "X");
        let stranger = Uuid::new_v4();

        let err = plan_drop(&todos, &DropInstruction::onto_todo(x, stranger)).unwrap_err();

        assert_eq!(
            err,
            OrderingError::InvalidTarget {
                target: stranger.to_string()
            }
        );
    }

    #[rstest]
    #[case("done", Ok(Status::Done))]
    #[case(" doing ", Ok(Status::Doing))]
    #[case("next", Ok(Status::New))]
    #[case("backlog", Err(OrderingError::InvalidTarget { target: "backlog".to_string() }))]
    fn test_parse_column(#[case] name: &str, #[case] expected: Result<Status, OrderingError>) {
        assert_eq!(parse_column(name), expected);
    }

    #[test]
    fn test_unknown_dragged_card() {
        let todos = board();
        let ghost = Uuid::new_v4();
        assert_eq!(
            plan_move(&todos, ghost, Status::Todo, 0),
            Err(OrderingError::UnknownCard { id: ghost })
        );
    }

    #[test]
    fn test_move_index_past_end_is_clamped() {
        let todos = board();
        let x = id_of(&todos, "X");

        let plan = plan_move(&todos, x, Status::Doing, 99).unwrap().unwrap();

        assert_eq!(plan.moved.order, 2);
        assert!(plan.crosses_columns());
        assert_eq!(plan.source, Status::Todo);
    }

    #[test]
    fn test_plan_lists_only_affected_columns() {
        let mut todos = board();
        todos.push(card("D", Status::Done, 0));
        let x = id_of(&todos, "X");

        let plan = plan_move(&todos, x, Status::Doing, 0).unwrap().unwrap();

        assert_eq!(plan.placements.len(), 5);
        assert!(plan.placements.iter().all(|p| p.status != Status::Done));
        // X moves, P and Q shift, Y and Z compact
        assert_eq!(plan.changes(&todos).len(), 5);
    }

    #[test]
    fn test_plan_removal_closes_gap() {
        let todos = board();
        let y = id_of(&todos, "Y");

        let placements = plan_removal(&todos, y).unwrap();

        let orders: Vec<i64> = placements.iter().map(|p| p.order).collect();
        assert_eq!(orders, [0, 1]);
        assert_eq!(changed_placements(&todos, &placements).len(), 1);
    }

    #[test]
    fn test_next_order() {
        let todos = board();
        assert_eq!(next_order(&todos, Status::Todo), 3);
        assert_eq!(next_order(&todos, Status::Done), 0);
    }

    fn placed(todos: &[Todo], id: Uuid) -> (Status, i64) {
        let todo = todos.iter().find(|t| t.id == id).unwrap();
        (todo.status, todo.order)
    }

    fn dense_board(statuses: &[Status]) -> Vec<Todo> {
        let mut todos = Vec::new();
        for (i, status) in statuses.iter().enumerate() {
            let order = next_order(&todos, *status);
            todos.push(card(&format!("c{i}"), *status, order));
        }
        todos
    }

    proptest! {
        #[test]
        fn test_drops_keep_columns_dense_and_insert_before(
            statuses in prop::collection::vec(prop::sample::select(Status::ALL.to_vec()), 1..12),
            drops in prop::collection::vec(any::<(prop::sample::Index, prop::sample::Index)>(), 0..50),
        ) {
            let mut todos = dense_board(&statuses);
            let ids: Vec<Uuid> = todos.iter().map(|t| t.id).collect();

            for (dragged, pick) in drops {
                let dragged = ids[dragged.index(ids.len())];
                let pick = pick.index(ids.len() + Status::ALL.len());
                let target = match ids.get(pick) {
                    Some(id) => DropTarget::Todo(*id),
                    None => DropTarget::Column(Status::ALL[pick - ids.len()]),
                };
                let before = todos.clone();

                if let Some(plan) = plan_drop(&todos, &DropInstruction { dragged, target }).unwrap() {
                    plan.apply(&mut todos);
                }
                prop_assert!(is_dense(&todos));

                match target {
                    DropTarget::Todo(target) if target != dragged => {
                        let (status, order) = placed(&todos, dragged);
                        let (target_status, target_order) = placed(&todos, target);
                        let (old_status, old_order) = placed(&before, dragged);
                        let (_, old_target_order) = placed(&before, target);

                        prop_assert_eq!(status, target_status);
                        prop_assert_eq!(order + 1, target_order);
                        if old_status != target_status || old_order > old_target_order {
                            prop_assert_eq!(order, old_target_order);
                        }
                    }
                    DropTarget::Todo(_) => {
                        prop_assert_eq!(&todos, &before);
                    }
                    DropTarget::Column(column) => {
                        let len = todos.iter().filter(|t| t.status == column).count();
                        prop_assert_eq!(placed(&todos, dragged), (column, to_order(len - 1)));
                    }
                }
            }
        }
    }
}
