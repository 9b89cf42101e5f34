use speculate2::speculate;
use uuid::Uuid;
use waypoint::db::Database;
use waypoint::models::*;

fn create_test_project(db: &Database) -> Project {
    db.create_project(CreateProjectInput {
        name: "Test Project".to_string(),
        description: None,
        requires_verification: false,
    })
    .expect("Failed to create project")
}

fn create_test_feature(db: &Database, project_id: Option<Uuid>) -> Feature {
    db.create_feature(CreateFeatureInput {
        project_id,
        title: "Test Feature".to_string(),
        description: None,
        requires_verification: false,
    })
    .expect("Failed to create feature")
}

fn create_test_task(db: &Database, feature_id: Option<Uuid>) -> Task {
    db.create_task(CreateTaskInput {
        feature_id,
        title: "Test Task".to_string(),
        description: None,
        requires_verification: false,
    })
    .expect("Failed to create task")
}

speculate! {
    before {
        let db = Database::open_memory().expect("Failed to create in-memory database");
        db.migrate().expect("Failed to run migrations");
    }

    describe "projects" {
        describe "create_project" {
            it "creates a project in planning status" {
                let project = db.create_project(CreateProjectInput {
                    name: "My Project".to_string(),
                    description: Some("What it is about".to_string()),
                    requires_verification: true,
                }).expect("Failed to create project");

                assert_eq!(project.name, "My Project");
                assert_eq!(project.status, ProjectStatus::Planning);
                assert!(project.requires_verification);
            }
        }

        describe "get_project" {
            it "returns None for a non-existent project" {
                let result = db.get_project(Uuid::new_v4()).expect("Query failed");
                assert!(result.is_none());
            }

            it "returns the project by id" {
                let created = create_test_project(&db);
                let found = db.get_project(created.id).expect("Query failed").expect("Missing");
                assert_eq!(found.name, created.name);
                assert_eq!(found.status, ProjectStatus::Planning);
            }
        }

        describe "get_all_projects" {
            it "returns all projects ordered by name" {
                for name in ["Zebra", "Alpha"] {
                    db.create_project(CreateProjectInput {
                        name: name.to_string(),
                        description: None,
                        requires_verification: false,
                    }).expect("Failed to create");
                }

                let projects = db.get_all_projects().expect("Query failed");
                assert_eq!(projects.len(), 2);
                assert_eq!(projects[0].name, "Alpha");
                assert_eq!(projects[1].name, "Zebra");
            }
        }

        describe "set_project_status" {
            it "persists the status and refreshes updated_at" {
                let project = create_test_project(&db);
                db.set_project_status(project.id, ProjectStatus::InDevelopment)
                    .expect("Failed to set status");

                let reloaded = db.get_project(project.id).unwrap().unwrap();
                assert_eq!(reloaded.status, ProjectStatus::InDevelopment);
                assert!(reloaded.updated_at >= project.updated_at);
            }

            it "fails for a non-existent project" {
                let result = db.set_project_status(Uuid::new_v4(), ProjectStatus::Completed);
                assert!(result.is_err());
                assert!(result.unwrap_err().to_string().contains("not found"));
            }
        }

        describe "delete_project" {
            it "detaches features rather than deleting them" {
                let project = create_test_project(&db);
                let feature = create_test_feature(&db, Some(project.id));

                assert!(db.delete_project(project.id).expect("Delete failed"));

                let orphan = db.get_feature(feature.id).unwrap().expect("Feature should survive");
                assert!(orphan.project_id.is_none());
            }
        }
    }

    describe "features" {
        describe "create_feature" {
            it "rejects an unknown project id" {
                let result = db.create_feature(CreateFeatureInput {
                    project_id: Some(Uuid::new_v4()),
                    title: "Orphan".to_string(),
                    description: None,
                    requires_verification: false,
                });
                assert!(result.is_err());
            }

            it "allows a feature without a project" {
                let feature = create_test_feature(&db, None);
                assert!(feature.project_id.is_none());
                assert_eq!(feature.status, FeatureStatus::Planning);
            }
        }

        describe "get_features_by_project" {
            it "returns only the project's features" {
                let project = create_test_project(&db);
                let other = create_test_project(&db);
                create_test_feature(&db, Some(project.id));
                create_test_feature(&db, Some(other.id));

                let features = db.get_features_by_project(project.id).expect("Query failed");
                assert_eq!(features.len(), 1);
            }
        }
    }

    describe "tasks" {
        describe "create_task" {
            it "starts tasks in pending" {
                let task = create_test_task(&db, None);
                assert_eq!(task.status, TaskStatus::Pending);
            }

            it "rejects an unknown feature id" {
                let result = db.create_task(CreateTaskInput {
                    feature_id: Some(Uuid::new_v4()),
                    title: "Orphan".to_string(),
                    description: None,
                    requires_verification: false,
                });
                assert!(result.is_err());
            }
        }

        describe "get_tasks_by_feature" {
            it "returns tasks ordered by creation" {
                let feature = create_test_feature(&db, None);
                let first = create_test_task(&db, Some(feature.id));
                let second = create_test_task(&db, Some(feature.id));

                let tasks = db.get_tasks_by_feature(feature.id).expect("Query failed");
                assert_eq!(tasks.len(), 2);
                assert_eq!(tasks[0].id, first.id);
                assert_eq!(tasks[1].id, second.id);
            }
        }

        describe "set_task_status" {
            it "fails for a non-existent task" {
                let result = db.set_task_status(Uuid::new_v4(), TaskStatus::Completed);
                assert!(result.is_err());
            }
        }
    }

    describe "resolve_entity" {
        it "returns None for an unknown id" {
            let result = db.resolve_entity(Uuid::new_v4()).expect("Query failed");
            assert!(result.is_none());
        }

        it "resolves each entity kind" {
            let project = create_test_project(&db);
            let feature = create_test_feature(&db, Some(project.id));
            let task = create_test_task(&db, Some(feature.id));

            assert!(matches!(
                db.resolve_entity(project.id).unwrap(),
                Some(Entity::Project(_))
            ));
            assert!(matches!(
                db.resolve_entity(feature.id).unwrap(),
                Some(Entity::Feature(_))
            ));
            assert!(matches!(
                db.resolve_entity(task.id).unwrap(),
                Some(Entity::Task(_))
            ));
        }
    }

    describe "dependencies" {
        describe "add_dependency" {
            it "rejects edges to unknown tasks" {
                let task = create_test_task(&db, None);
                let result = db.add_dependency(CreateDependencyInput {
                    from_task_id: task.id,
                    to_task_id: Uuid::new_v4(),
                    dep_type: DependencyType::Blocks,
                });
                assert!(result.is_err());
            }
        }

        describe "incoming_blocking_tasks" {
            it "resolves the 'blocks' spelling" {
                let blocker = create_test_task(&db, None);
                let blocked = create_test_task(&db, None);
                db.add_dependency(CreateDependencyInput {
                    from_task_id: blocker.id,
                    to_task_id: blocked.id,
                    dep_type: DependencyType::Blocks,
                }).expect("Failed to add dependency");

                let blockers = db.incoming_blocking_tasks(blocked.id).expect("Query failed");
                assert_eq!(blockers.len(), 1);
                assert_eq!(blockers[0].id, blocker.id);
            }

            it "resolves the 'is_blocked_by' spelling" {
                let blocker = create_test_task(&db, None);
                let blocked = create_test_task(&db, None);
                db.add_dependency(CreateDependencyInput {
                    from_task_id: blocked.id,
                    to_task_id: blocker.id,
                    dep_type: DependencyType::IsBlockedBy,
                }).expect("Failed to add dependency");

                let blockers = db.incoming_blocking_tasks(blocked.id).expect("Query failed");
                assert_eq!(blockers.len(), 1);
                assert_eq!(blockers[0].id, blocker.id);
            }

            it "ignores relates_to edges" {
                let other = create_test_task(&db, None);
                let task = create_test_task(&db, None);
                db.add_dependency(CreateDependencyInput {
                    from_task_id: other.id,
                    to_task_id: task.id,
                    dep_type: DependencyType::RelatesTo,
                }).expect("Failed to add dependency");

                let blockers = db.incoming_blocking_tasks(task.id).expect("Query failed");
                assert!(blockers.is_empty());
            }

            it "deduplicates a doubly-spelled edge" {
                let blocker = create_test_task(&db, None);
                let blocked = create_test_task(&db, None);
                db.add_dependency(CreateDependencyInput {
                    from_task_id: blocker.id,
                    to_task_id: blocked.id,
                    dep_type: DependencyType::Blocks,
                }).expect("Failed to add dependency");
                db.add_dependency(CreateDependencyInput {
                    from_task_id: blocked.id,
                    to_task_id: blocker.id,
                    dep_type: DependencyType::IsBlockedBy,
                }).expect("Failed to add dependency");

                let blockers = db.incoming_blocking_tasks(blocked.id).expect("Query failed");
                assert_eq!(blockers.len(), 1);
            }
        }

        describe "get_dependencies_for_task" {
            it "returns edges in both directions" {
                let a = create_test_task(&db, None);
                let b = create_test_task(&db, None);
                let c = create_test_task(&db, None);
                db.add_dependency(CreateDependencyInput {
                    from_task_id: a.id,
                    to_task_id: b.id,
                    dep_type: DependencyType::Blocks,
                }).unwrap();
                db.add_dependency(CreateDependencyInput {
                    from_task_id: b.id,
                    to_task_id: c.id,
                    dep_type: DependencyType::RelatesTo,
                }).unwrap();

                let deps = db.get_dependencies_for_task(b.id).expect("Query failed");
                assert_eq!(deps.len(), 2);
            }
        }
    }

    describe "verifications" {
        describe "set_verification" {
            it "rejects an unknown entity" {
                let result = db.set_verification(SetVerificationInput {
                    entity_id: Uuid::new_v4(),
                    criteria: vec![],
                });
                assert!(result.is_err());
            }

            it "replaces the existing block on conflict" {
                let task = create_test_task(&db, None);
                db.set_verification(SetVerificationInput {
                    entity_id: task.id,
                    criteria: vec![VerificationCriterion {
                        criteria: "lints clean".to_string(),
                        pass: false,
                    }],
                }).expect("Failed to set verification");

                db.set_verification(SetVerificationInput {
                    entity_id: task.id,
                    criteria: vec![VerificationCriterion {
                        criteria: "lints clean".to_string(),
                        pass: true,
                    }],
                }).expect("Failed to update verification");

                let blocks = db.get_verification_blocks(task.id).expect("Query failed");
                assert_eq!(blocks.len(), 1);
                assert_eq!(blocks[0].criteria.len(), 1);
                assert!(blocks[0].criteria[0].pass);
                assert!(blocks[0].is_satisfied());
            }
        }

        describe "is_satisfied" {
            it "is false for an empty criteria list" {
                let task = create_test_task(&db, None);
                let block = db.set_verification(SetVerificationInput {
                    entity_id: task.id,
                    criteria: vec![],
                }).expect("Failed to set verification");
                assert!(!block.is_satisfied());
            }
        }
    }

    describe "open_on_disk" {
        it "persists across reopens" {
            let dir = tempfile::tempdir().expect("Failed to create temp dir");
            let path = dir.path().join("waypoint.db");

            {
                let disk = Database::open(path.clone()).expect("Failed to open");
                disk.migrate().expect("Failed to migrate");
                create_test_project(&disk);
            }

            let reopened = Database::open(path).expect("Failed to reopen");
            reopened.migrate().expect("Failed to re-run migrations");
            let projects = reopened.get_all_projects().expect("Query failed");
            assert_eq!(projects.len(), 1);
        }
    }
}
