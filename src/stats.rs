//! Statistics Aggregator
//! Mission: Fold the record collections into the admin summary report
//!
//! Pure recompute on every call - no running counters to drift. The input
//! snapshot comes from one store lock acquisition, so totals and
//! breakdowns always agree.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

use crate::auth::models::User;
use crate::models::{ProjectStatus, ShiftType, TaskStatus, TimeEntry};
use crate::store::Snapshot;

/// Admin statistics report. Every field is always present; enum-keyed
/// maps carry all variants even at zero so downstream percentage math
/// stays well-defined.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsResponse {
    pub total_users: usize,
    pub active_users: usize,
    pub total_projects: usize,
    pub active_projects: usize,
    pub total_tasks: usize,
    pub tasks_by_status: BTreeMap<String, usize>,
    pub average_time_per_project: BTreeMap<String, f64>,
    pub top_users_by_hours: Vec<UserHours>,
    pub shift_distribution: BTreeMap<String, usize>,
}

/// One row of the top-users ranking
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserHours {
    pub user_id: Uuid,
    pub username: String,
    pub total_hours: f64,
    pub completed_tasks: usize,
}

/// How many rows the top-users ranking keeps
const TOP_USERS_LIMIT: usize = 5;

fn hours(entry: &TimeEntry) -> Option<f64> {
    entry
        .duration()
        .map(|d| d.num_seconds() as f64 / 3600.0)
}

/// Fold users, projects, tasks, shifts, and the ledger into the report
pub fn compute_statistics(users: &[User], snapshot: &Snapshot) -> StatisticsResponse {
    let total_users = users.len();
    let active_users = users.iter().filter(|u| u.is_active).count();

    let total_projects = snapshot.projects.len();
    let active_projects = snapshot
        .projects
        .iter()
        .filter(|p| p.status == ProjectStatus::Active)
        .count();

    // All statuses present, zero-defaulted
    let mut tasks_by_status: BTreeMap<String, usize> = TaskStatus::ALL
        .iter()
        .map(|s| (s.as_str().to_string(), 0))
        .collect();
    for task in &snapshot.tasks {
        *tasks_by_status
            .entry(task.status.as_str().to_string())
            .or_insert(0) += 1;
    }

    // Mean closed-entry hours per project. Open entries are excluded
    // outright - they are unfinished work, not zero-length work.
    let mut project_hours: HashMap<Uuid, (f64, usize)> = HashMap::new();
    for entry in &snapshot.entries {
        if let Some(h) = hours(entry) {
            let slot = project_hours.entry(entry.project_id).or_insert((0.0, 0));
            slot.0 += h;
            slot.1 += 1;
        }
    }
    let average_time_per_project: BTreeMap<String, f64> = project_hours
        .into_iter()
        .map(|(project_id, (total, count))| {
            let name = snapshot
                .projects
                .iter()
                .find(|p| p.id == project_id)
                .map(|p| p.name.clone())
                .unwrap_or_else(|| project_id.to_string());
            (name, total / count as f64)
        })
        .collect();

    // Total closed-entry hours per user. Every known user participates
    // (at zero), plus any ledger user no longer in the user set.
    let mut user_hours: HashMap<Uuid, f64> = users.iter().map(|u| (u.id, 0.0)).collect();
    for entry in &snapshot.entries {
        if let Some(h) = hours(entry) {
            *user_hours.entry(entry.user_id).or_insert(0.0) += h;
        }
    }

    let mut completed_by_user: HashMap<Uuid, usize> = HashMap::new();
    for task in &snapshot.tasks {
        if task.status == TaskStatus::Done {
            if let Some(assignee) = task.assigned_user_id {
                *completed_by_user.entry(assignee).or_insert(0) += 1;
            }
        }
    }

    let mut ranking: Vec<UserHours> = user_hours
        .into_iter()
        .map(|(user_id, total_hours)| UserHours {
            user_id,
            username: users
                .iter()
                .find(|u| u.id == user_id)
                .map(|u| u.username.clone())
                .unwrap_or_else(|| user_id.to_string()),
            total_hours,
            completed_tasks: completed_by_user.get(&user_id).copied().unwrap_or(0),
        })
        .collect();
    // Descending hours, ties broken by ascending user id
    ranking.sort_by(|a, b| {
        b.total_hours
            .partial_cmp(&a.total_hours)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.user_id.cmp(&b.user_id))
    });
    ranking.truncate(TOP_USERS_LIMIT);

    let mut shift_distribution: BTreeMap<String, usize> = ShiftType::ALL
        .iter()
        .map(|t| (t.as_str().to_string(), 0))
        .collect();
    for shift in &snapshot.shifts {
        *shift_distribution
            .entry(shift.shift_type.as_str().to_string())
            .or_insert(0) += 1;
    }

    StatisticsResponse {
        total_users,
        active_users,
        total_projects,
        active_projects,
        total_tasks: snapshot.tasks.len(),
        tasks_by_status,
        average_time_per_project,
        top_users_by_hours: ranking,
        shift_distribution,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::Role;
    use crate::models::{Project, Shift, Task};
    use chrono::{Duration, Utc};

    fn empty_snapshot() -> Snapshot {
        Snapshot {
            projects: vec![],
            tasks: vec![],
            shifts: vec![],
            entries: vec![],
        }
    }

    fn test_user(username: &str, id: Uuid, is_active: bool) -> User {
        User {
            id,
            username: username.to_string(),
            password_hash: "hash".to_string(),
            first_name: username.to_string(),
            last_name: "Test".to_string(),
            role: Role::Employee,
            is_active,
            created_at: Utc::now(),
        }
    }

    fn test_project(name: &str, status: ProjectStatus) -> Project {
        Project {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: String::new(),
            status,
            start_date: Utc::now(),
            end_date: None,
            created_at: Utc::now(),
        }
    }

    fn entry_for(user_id: Uuid, project_id: Uuid, hours: Option<i64>) -> TimeEntry {
        let start = Utc::now() - Duration::days(1);
        TimeEntry {
            id: Uuid::new_v4(),
            user_id,
            project_id,
            task_id: None,
            description: String::new(),
            start_time: start,
            end_time: hours.map(|h| start + Duration::hours(h)),
        }
    }

    #[test]
    fn test_empty_datasets_report_all_fields() {
        let report = compute_statistics(&[], &empty_snapshot());

        assert_eq!(report.total_users, 0);
        assert_eq!(report.active_users, 0);
        assert_eq!(report.total_projects, 0);
        assert_eq!(report.active_projects, 0);
        assert_eq!(report.total_tasks, 0);
        assert!(report.top_users_by_hours.is_empty());
        assert!(report.average_time_per_project.is_empty());

        // Enum-keyed maps keep every variant at zero
        assert_eq!(report.tasks_by_status.len(), 3);
        assert!(report.tasks_by_status.values().all(|&v| v == 0));
        assert_eq!(report.shift_distribution.len(), 3);
        assert!(report.shift_distribution.values().all(|&v| v == 0));

        // The serialized report omits nothing
        let json = serde_json::to_value(&report).unwrap();
        for field in [
            "totalUsers",
            "activeUsers",
            "totalProjects",
            "activeProjects",
            "totalTasks",
            "tasksByStatus",
            "averageTimePerProject",
            "topUsersByHours",
            "shiftDistribution",
        ] {
            assert!(json.get(field).is_some(), "missing field {}", field);
        }
    }

    #[test]
    fn test_average_excludes_open_entries() {
        let user = Uuid::new_v4();
        let project = test_project("Orion", ProjectStatus::Active);

        let mut snapshot = empty_snapshot();
        snapshot.entries = vec![
            entry_for(user, project.id, Some(2)), // closed, 2h
            entry_for(user, project.id, None),    // open - excluded, not zero
        ];
        snapshot.projects = vec![project];

        let report = compute_statistics(&[], &snapshot);
        // Mean is 2h over one closed entry, not 1h over two
        assert_eq!(report.average_time_per_project["Orion"], 2.0);
    }

    #[test]
    fn test_top_users_ranking_and_tie_break() {
        let mut ids = [Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
        ids.sort();
        let [low, mid, high] = ids;

        let project = test_project("Orion", ProjectStatus::Active);
        let users = vec![
            test_user("low", low, true),
            test_user("mid", mid, true),
            test_user("high", high, true),
        ];

        let mut snapshot = empty_snapshot();
        // mid and high tie at 3h; low leads with 5h
        snapshot.entries = vec![
            entry_for(low, project.id, Some(5)),
            entry_for(mid, project.id, Some(3)),
            entry_for(high, project.id, Some(3)),
        ];
        snapshot.projects = vec![project];

        let report = compute_statistics(&users, &snapshot);
        let ranked: Vec<Uuid> = report
            .top_users_by_hours
            .iter()
            .map(|u| u.user_id)
            .collect();
        // Tied users appear in ascending id order
        assert_eq!(ranked, vec![low, mid, high]);
    }

    #[test]
    fn test_top_users_truncated_to_five() {
        let project = test_project("Orion", ProjectStatus::Active);
        let users: Vec<User> = (0..8)
            .map(|i| test_user(&format!("user{}", i), Uuid::new_v4(), true))
            .collect();

        let mut snapshot = empty_snapshot();
        snapshot.entries = users
            .iter()
            .enumerate()
            .map(|(i, u)| entry_for(u.id, project.id, Some(i as i64 + 1)))
            .collect();
        snapshot.projects = vec![project];

        let report = compute_statistics(&users, &snapshot);
        assert_eq!(report.top_users_by_hours.len(), 5);
        // Highest total first
        assert_eq!(report.top_users_by_hours[0].total_hours, 8.0);
    }

    #[test]
    fn test_completed_tasks_follow_assignee() {
        let worker = Uuid::new_v4();
        let project = test_project("Orion", ProjectStatus::Active);
        let users = vec![test_user("worker", worker, true)];

        let task = |status: TaskStatus, assignee: Option<Uuid>| Task {
            id: Uuid::new_v4(),
            project_id: project.id,
            assigned_user_id: assignee,
            title: String::new(),
            description: String::new(),
            status,
            priority: 0,
            due_date: None,
            created_at: Utc::now(),
        };

        let mut snapshot = empty_snapshot();
        snapshot.tasks = vec![
            task(TaskStatus::Done, Some(worker)),
            task(TaskStatus::Done, Some(worker)),
            task(TaskStatus::Done, None),
            task(TaskStatus::InProgress, Some(worker)),
        ];
        snapshot.projects = vec![project];

        let report = compute_statistics(&users, &snapshot);
        assert_eq!(report.total_tasks, 4);
        assert_eq!(report.tasks_by_status["done"], 3);
        assert_eq!(report.tasks_by_status["in_progress"], 1);
        assert_eq!(report.tasks_by_status["todo"], 0);
        assert_eq!(report.top_users_by_hours[0].completed_tasks, 2);
    }

    #[test]
    fn test_counts_and_shift_distribution() {
        let users = vec![
            test_user("a", Uuid::new_v4(), true),
            test_user("b", Uuid::new_v4(), false),
        ];

        let shift = |shift_type: ShiftType| Shift {
            id: Uuid::new_v4(),
            shift_type,
            start_time: Utc::now(),
            end_time: Utc::now() + Duration::hours(8),
            assigned_employee_ids: vec![],
        };

        let mut snapshot = empty_snapshot();
        snapshot.projects = vec![
            test_project("Orion", ProjectStatus::Active),
            test_project("Vega", ProjectStatus::Completed),
        ];
        snapshot.shifts = vec![
            shift(ShiftType::Morning),
            shift(ShiftType::Morning),
            shift(ShiftType::Night),
        ];

        let report = compute_statistics(&users, &snapshot);
        assert_eq!(report.total_users, 2);
        assert_eq!(report.active_users, 1);
        assert_eq!(report.total_projects, 2);
        assert_eq!(report.active_projects, 1);
        assert_eq!(report.shift_distribution["morning"], 2);
        assert_eq!(report.shift_distribution["evening"], 0);
        assert_eq!(report.shift_distribution["night"], 1);
    }
}
