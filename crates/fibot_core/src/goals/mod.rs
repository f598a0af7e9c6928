use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use crate::domain::{now_timestamp, Goal};
use crate::error::AppError;

/// How far the shared savings pot covers one goal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GoalProgress {
    pub goal: Goal,
    pub saved: f64,
    /// `saved / target`, clamped to `[0, 1]`.
    pub fraction: f64,
    pub achieved: bool,
}

pub fn add_goal(conn: &Connection, name: &str, target: f64) -> Result<Goal, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::new("VALIDATION_GOAL", "Goal name must not be empty"));
    }
    if !(target.is_finite() && target > 0.0) {
        return Err(
            AppError::new("VALIDATION_GOAL", "Goal target must be greater than 0")
                .with_details(format!("target={target}")),
        );
    }
    let created_at = now_timestamp()?;
    conn.execute(
        "INSERT INTO user_goals(name, target, created_at) VALUES (?1, ?2, ?3)",
        params![name, target, created_at],
    )
    .map_err(|e| AppError::new("DB_INSERT_FAILED", "Failed to insert goal").with_details(e.to_string()))?;

    let goal = Goal {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
        target,
        created_at,
    };
    tracing::info!(id = goal.id, name = %goal.name, target = goal.target, "goal added");
    Ok(goal)
}

/// Goals in creation order (oldest first).
pub fn list_goals(conn: &Connection) -> Result<Vec<Goal>, AppError> {
    let mut stmt = conn
        .prepare("SELECT id, name, target, created_at FROM user_goals ORDER BY created_at ASC, id ASC")
        .map_err(|e| {
            AppError::new("DB_QUERY_FAILED", "Failed to prepare goals query").with_details(e.to_string())
        })?;
    let rows = stmt
        .query_map([], |row| {
            Ok(Goal {
                id: row.get(0)?,
                name: row.get(1)?,
                target: row.get(2)?,
                created_at: row.get(3)?,
            })
        })
        .map_err(|e| AppError::new("DB_QUERY_FAILED", "Failed to query goals").with_details(e.to_string()))?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r.map_err(|e| {
            AppError::new("DB_QUERY_FAILED", "Failed to decode goal row").with_details(e.to_string())
        })?);
    }
    Ok(out)
}

pub fn delete_goal(conn: &Connection, id: i64) -> Result<(), AppError> {
    let n = conn
        .execute("DELETE FROM user_goals WHERE id = ?1", [id])
        .map_err(|e| AppError::new("DB_DELETE_FAILED", "Failed to delete goal").with_details(e.to_string()))?;
    if n == 0 {
        return Err(AppError::new("GOAL_NOT_FOUND", "Goal not found").with_details(format!("id={id}")));
    }
    tracing::info!(id, "goal removed");
    Ok(())
}

/// Every goal is measured against the same savings total; there is no per-goal allocation.
pub fn goal_progress(goals: &[Goal], saved: f64) -> Vec<GoalProgress> {
    goals
        .iter()
        .map(|g| {
            let fraction = if g.target > 0.0 {
                (saved / g.target).clamp(0.0, 1.0)
            } else {
                0.0
            };
            GoalProgress {
                goal: g.clone(),
                saved,
                fraction,
                achieved: fraction >= 1.0,
            }
        })
        .collect()
}
