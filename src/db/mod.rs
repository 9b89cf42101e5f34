mod schema;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row};
use uuid::Uuid;

use crate::models::*;

pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_default() -> Result<Self> {
        let dirs = directories::ProjectDirs::from("", "", "waypoint")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        let db_path = dirs.data_dir().join("waypoint.db");
        Self::open(db_path)
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn)
    }

    // ============================================================
    // Project operations
    // ============================================================

    pub fn get_all_projects(&self) -> Result<Vec<Project>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, name, description, status, requires_verification, created_at, updated_at
             FROM projects ORDER BY name",
        )?;

        let projects = stmt
            .query_map([], project_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(projects)
    }

    pub fn get_project(&self, id: Uuid) -> Result<Option<Project>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, name, description, status, requires_verification, created_at, updated_at
             FROM projects WHERE id = ?",
        )?;

        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(project_from_row(row)?)),
            None => Ok(None),
        }
    }

    pub fn create_project(&self, input: CreateProjectInput) -> Result<Project> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO projects (id, name, description, status, requires_verification, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            (
                id.to_string(),
                &input.name,
                &input.description,
                ProjectStatus::Planning.as_str(),
                input.requires_verification as i32,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )?;

        Ok(Project {
            id,
            name: input.name,
            description: input.description,
            status: ProjectStatus::Planning,
            requires_verification: input.requires_verification,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn delete_project(&self, id: Uuid) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute("DELETE FROM projects WHERE id = ?", [id.to_string()])?;
        Ok(rows > 0)
    }

    /// Write a project's status and refresh `updated_at`.
    pub fn set_project_status(&self, id: Uuid, status: ProjectStatus) -> Result<DateTime<Utc>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let now = Utc::now();
        let rows = conn.execute(
            "UPDATE projects SET status = ?, updated_at = ? WHERE id = ?",
            (status.as_str(), now.to_rfc3339(), id.to_string()),
        )?;
        if rows == 0 {
            anyhow::bail!("Project not found: {}", id);
        }
        Ok(now)
    }

    // ============================================================
    // Feature operations
    // ============================================================

    pub fn get_feature(&self, id: Uuid) -> Result<Option<Feature>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, project_id, title, description, status, requires_verification, created_at, updated_at
             FROM features WHERE id = ?",
        )?;

        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(feature_from_row(row)?)),
            None => Ok(None),
        }
    }

    pub fn get_features_by_project(&self, project_id: Uuid) -> Result<Vec<Feature>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, project_id, title, description, status, requires_verification, created_at, updated_at
             FROM features WHERE project_id = ? ORDER BY title",
        )?;

        let features = stmt
            .query_map([project_id.to_string()], feature_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(features)
    }

    pub fn create_feature(&self, input: CreateFeatureInput) -> Result<Feature> {
        if let Some(project_id) = input.project_id {
            self.get_project(project_id)?
                .ok_or_else(|| anyhow::anyhow!("Project not found: {}", project_id))?;
        }

        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO features (id, project_id, title, description, status, requires_verification, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            (
                id.to_string(),
                input.project_id.map(|u| u.to_string()),
                &input.title,
                &input.description,
                FeatureStatus::Planning.as_str(),
                input.requires_verification as i32,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )?;

        Ok(Feature {
            id,
            project_id: input.project_id,
            title: input.title,
            description: input.description,
            status: FeatureStatus::Planning,
            requires_verification: input.requires_verification,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn delete_feature(&self, id: Uuid) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute("DELETE FROM features WHERE id = ?", [id.to_string()])?;
        Ok(rows > 0)
    }

    /// Write a feature's status and refresh `updated_at`.
    pub fn set_feature_status(&self, id: Uuid, status: FeatureStatus) -> Result<DateTime<Utc>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let now = Utc::now();
        let rows = conn.execute(
            "UPDATE features SET status = ?, updated_at = ? WHERE id = ?",
            (status.as_str(), now.to_rfc3339(), id.to_string()),
        )?;
        if rows == 0 {
            anyhow::bail!("Feature not found: {}", id);
        }
        Ok(now)
    }

    // ============================================================
    // Task operations
    // ============================================================

    pub fn get_task(&self, id: Uuid) -> Result<Option<Task>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, feature_id, title, description, status, requires_verification, created_at, updated_at
             FROM tasks WHERE id = ?",
        )?;

        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(task_from_row(row)?)),
            None => Ok(None),
        }
    }

    pub fn get_tasks_by_feature(&self, feature_id: Uuid) -> Result<Vec<Task>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, feature_id, title, description, status, requires_verification, created_at, updated_at
             FROM tasks WHERE feature_id = ? ORDER BY created_at",
        )?;

        let tasks = stmt
            .query_map([feature_id.to_string()], task_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(tasks)
    }

    pub fn create_task(&self, input: CreateTaskInput) -> Result<Task> {
        if let Some(feature_id) = input.feature_id {
            self.get_feature(feature_id)?
                .ok_or_else(|| anyhow::anyhow!("Feature not found: {}", feature_id))?;
        }

        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO tasks (id, feature_id, title, description, status, requires_verification, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            (
                id.to_string(),
                input.feature_id.map(|u| u.to_string()),
                &input.title,
                &input.description,
                TaskStatus::Pending.as_str(),
                input.requires_verification as i32,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )?;

        Ok(Task {
            id,
            feature_id: input.feature_id,
            title: input.title,
            description: input.description,
            status: TaskStatus::Pending,
            requires_verification: input.requires_verification,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn delete_task(&self, id: Uuid) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute("DELETE FROM tasks WHERE id = ?", [id.to_string()])?;
        Ok(rows > 0)
    }

    /// Write a task's status and refresh `updated_at`.
    pub fn set_task_status(&self, id: Uuid, status: TaskStatus) -> Result<DateTime<Utc>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let now = Utc::now();
        let rows = conn.execute(
            "UPDATE tasks SET status = ?, updated_at = ? WHERE id = ?",
            (status.as_str(), now.to_rfc3339(), id.to_string()),
        )?;
        if rows == 0 {
            anyhow::bail!("Task not found: {}", id);
        }
        Ok(now)
    }

    // ============================================================
    // Entity resolution
    // ============================================================

    /// Look up an id across the three entity tables. Ids are v4 UUIDs, so a
    /// hit in one table is a hit overall.
    pub fn resolve_entity(&self, id: Uuid) -> Result<Option<Entity>> {
        if let Some(task) = self.get_task(id)? {
            return Ok(Some(Entity::Task(task)));
        }
        if let Some(feature) = self.get_feature(id)? {
            return Ok(Some(Entity::Feature(feature)));
        }
        if let Some(project) = self.get_project(id)? {
            return Ok(Some(Entity::Project(project)));
        }
        Ok(None)
    }

    // ============================================================
    // Dependency operations
    // ============================================================

    pub fn add_dependency(&self, input: CreateDependencyInput) -> Result<Dependency> {
        self.get_task(input.from_task_id)?
            .ok_or_else(|| anyhow::anyhow!("Task not found: {}", input.from_task_id))?;
        self.get_task(input.to_task_id)?
            .ok_or_else(|| anyhow::anyhow!("Task not found: {}", input.to_task_id))?;

        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO dependencies (id, from_task_id, to_task_id, dep_type, created_at)
             VALUES (?, ?, ?, ?, ?)",
            (
                id.to_string(),
                input.from_task_id.to_string(),
                input.to_task_id.to_string(),
                input.dep_type.as_str(),
                now.to_rfc3339(),
            ),
        )?;

        Ok(Dependency {
            id,
            from_task_id: input.from_task_id,
            to_task_id: input.to_task_id,
            dep_type: input.dep_type,
            created_at: now,
        })
    }

    pub fn get_dependencies_for_task(&self, task_id: Uuid) -> Result<Vec<Dependency>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, from_task_id, to_task_id, dep_type, created_at
             FROM dependencies WHERE from_task_id = ? OR to_task_id = ?
             ORDER BY created_at",
        )?;

        let deps = stmt
            .query_map([task_id.to_string(), task_id.to_string()], |row| {
                Ok(Dependency {
                    id: parse_uuid(row.get::<_, String>(0)?),
                    from_task_id: parse_uuid(row.get::<_, String>(1)?),
                    to_task_id: parse_uuid(row.get::<_, String>(2)?),
                    dep_type: DependencyType::from_str(&row.get::<_, String>(3)?)
                        .unwrap_or(DependencyType::RelatesTo),
                    created_at: parse_datetime(row.get::<_, String>(4)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(deps)
    }

    /// Tasks that block `task_id`, resolving both edge spellings:
    /// `(X, task, blocks)` and `(task, X, is_blocked_by)`.
    pub fn incoming_blocking_tasks(&self, task_id: Uuid) -> Result<Vec<Task>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT t.id, t.feature_id, t.title, t.description, t.status, t.requires_verification, t.created_at, t.updated_at
             FROM tasks t
             WHERE t.id IN (
                 SELECT from_task_id FROM dependencies WHERE to_task_id = ?1 AND dep_type = 'blocks'
                 UNION
                 SELECT to_task_id FROM dependencies WHERE from_task_id = ?1 AND dep_type = 'is_blocked_by'
             )
             ORDER BY t.created_at",
        )?;

        let tasks = stmt
            .query_map([task_id.to_string()], task_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(tasks)
    }

    // ============================================================
    // Verification operations
    // ============================================================

    /// Attach or replace the verification block for an entity.
    pub fn set_verification(&self, input: SetVerificationInput) -> Result<VerificationBlock> {
        self.resolve_entity(input.entity_id)?
            .ok_or_else(|| anyhow::anyhow!("Entity not found: {}", input.entity_id))?;

        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();
        let criteria_json = serde_json::to_string(&input.criteria)?;

        conn.execute(
            "INSERT INTO verifications (id, entity_id, criteria, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(entity_id) DO UPDATE SET criteria = excluded.criteria, updated_at = excluded.updated_at",
            (
                id.to_string(),
                input.entity_id.to_string(),
                &criteria_json,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )?;

        Ok(VerificationBlock {
            id,
            entity_id: input.entity_id,
            criteria: input.criteria,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn get_verification_blocks(&self, entity_id: Uuid) -> Result<Vec<VerificationBlock>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, entity_id, criteria, created_at, updated_at
             FROM verifications WHERE entity_id = ? ORDER BY created_at",
        )?;

        let blocks = stmt
            .query_map([entity_id.to_string()], |row| {
                let criteria_json: String = row.get(2)?;
                let criteria: Vec<VerificationCriterion> =
                    serde_json::from_str(&criteria_json).unwrap_or_default();

                Ok(VerificationBlock {
                    id: parse_uuid(row.get::<_, String>(0)?),
                    entity_id: parse_uuid(row.get::<_, String>(1)?),
                    criteria,
                    created_at: parse_datetime(row.get::<_, String>(3)?),
                    updated_at: parse_datetime(row.get::<_, String>(4)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(blocks)
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

// ============================================================
// Row mapping
// ============================================================

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: parse_uuid(row.get::<_, String>(0)?),
        name: row.get(1)?,
        description: row.get(2)?,
        status: ProjectStatus::from_str(&row.get::<_, String>(3)?)
            .unwrap_or(ProjectStatus::Planning),
        requires_verification: row.get::<_, i32>(4)? != 0,
        created_at: parse_datetime(row.get::<_, String>(5)?),
        updated_at: parse_datetime(row.get::<_, String>(6)?),
    })
}

fn feature_from_row(row: &Row<'_>) -> rusqlite::Result<Feature> {
    Ok(Feature {
        id: parse_uuid(row.get::<_, String>(0)?),
        project_id: row.get::<_, Option<String>>(1)?.map(parse_uuid),
        title: row.get(2)?,
        description: row.get(3)?,
        status: FeatureStatus::from_str(&row.get::<_, String>(4)?)
            .unwrap_or(FeatureStatus::Planning),
        requires_verification: row.get::<_, i32>(5)? != 0,
        created_at: parse_datetime(row.get::<_, String>(6)?),
        updated_at: parse_datetime(row.get::<_, String>(7)?),
    })
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: parse_uuid(row.get::<_, String>(0)?),
        feature_id: row.get::<_, Option<String>>(1)?.map(parse_uuid),
        title: row.get(2)?,
        description: row.get(3)?,
        status: TaskStatus::from_str(&row.get::<_, String>(4)?).unwrap_or(TaskStatus::Pending),
        requires_verification: row.get::<_, i32>(5)? != 0,
        created_at: parse_datetime(row.get::<_, String>(6)?),
        updated_at: parse_datetime(row.get::<_, String>(7)?),
    })
}

fn parse_uuid(s: String) -> Uuid {
    Uuid::parse_str(&s).unwrap_or_else(|_| Uuid::nil())
}

fn parse_datetime(s: String) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
