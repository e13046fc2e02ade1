//! PostgreSQL-backed directory tests.
//!
//! Run with `cargo test -- --ignored` against a database reachable at
//! `TEST_DATABASE_URL`.

mod common;

use common::*;
use scope_service::models::{OrgLevel, Role, TargetKind};
use scope_service::services::{
    AccessEnforcer, Database, Directory, ForbiddenReason, Page, PermissionTable, RecordStore,
    ScopeResolver,
};
use sqlx::PgPool;
use std::collections::BTreeSet;
use std::sync::Arc;

const BASE: i64 = 9_100_000;
const PG_COORDINATOR: i64 = BASE + 1;
const PG_PROFESSOR: i64 = BASE + 2;
const PG_DEPARTMENT: i64 = BASE + 3;

fn id(n: i64) -> i64 {
    BASE + n
}

async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    for table in [
        "coordination_affiliations",
        "professor_affiliations",
        "department_affiliations",
    ] {
        sqlx::query(&format!("DELETE FROM {} WHERE user_id = ANY($1)", table))
            .bind(vec![PG_COORDINATOR, PG_PROFESSOR, PG_DEPARTMENT])
            .execute(pool)
            .await?;
    }

    sqlx::query("INSERT INTO campuses (campus_id) VALUES ($1) ON CONFLICT DO NOTHING")
        .bind(id(100))
        .execute(pool)
        .await?;
    for unit in [id(200), id(201)] {
        sqlx::query(
            "INSERT INTO units (unit_id, campus_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(unit)
        .bind(id(100))
        .execute(pool)
        .await?;
    }
    sqlx::query(
        "INSERT INTO departments (department_id, unit_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(id(250))
    .bind(id(200))
    .execute(pool)
    .await?;

    for (course, unit) in [(id(300), id(200)), (id(301), id(200)), (id(302), id(201))] {
        sqlx::query(
            "INSERT INTO courses (course_id, unit_id, course_name) VALUES ($1, $2, 'course') \
             ON CONFLICT DO NOTHING",
        )
        .bind(course)
        .bind(unit)
        .execute(pool)
        .await?;
    }
    for (discipline, course) in [(id(400), id(300)), (id(401), id(301)), (id(402), id(302))] {
        sqlx::query(
            "INSERT INTO disciplines (discipline_id, course_id, discipline_name) \
             VALUES ($1, $2, 'discipline') ON CONFLICT DO NOTHING",
        )
        .bind(discipline)
        .bind(course)
        .execute(pool)
        .await?;
    }
    for (student, course, discipline) in [
        (id(500), id(300), id(400)),
        (id(501), id(301), id(401)),
        (id(502), id(302), id(402)),
    ] {
        sqlx::query(
            "INSERT INTO students (student_id, course_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(student)
        .bind(course)
        .execute(pool)
        .await?;
        sqlx::query(
            "INSERT INTO student_disciplines (student_id, discipline_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(student)
        .bind(discipline)
        .execute(pool)
        .await?;
    }

    for (user, role) in [
        (PG_COORDINATOR, Role::Coordination),
        (PG_PROFESSOR, Role::Professor),
        (PG_DEPARTMENT, Role::Department),
    ] {
        sqlx::query(
            "INSERT INTO users (user_id, role_code) VALUES ($1, $2) \
             ON CONFLICT (user_id) DO UPDATE SET role_code = EXCLUDED.role_code",
        )
        .bind(user)
        .bind(role.code())
        .execute(pool)
        .await?;
    }

    sqlx::query(
        "INSERT INTO coordination_affiliations (user_id, unit_id, course_id) VALUES ($1, $2, $3)",
    )
    .bind(PG_COORDINATOR)
    .bind(id(200))
    .bind(id(300))
    .execute(pool)
    .await?;
    sqlx::query(
        "INSERT INTO professor_affiliations (user_id, unit_id, discipline_id) VALUES ($1, $2, $3)",
    )
    .bind(PG_PROFESSOR)
    .bind(id(200))
    .bind(id(401))
    .execute(pool)
    .await?;
    sqlx::query(
        "INSERT INTO department_affiliations (user_id, unit_id, department_id) VALUES ($1, $2, $3)",
    )
    .bind(PG_DEPARTMENT)
    .bind(id(200))
    .bind(id(250))
    .execute(pool)
    .await?;

    Ok(())
}

async fn seeded_database() -> Arc<Database> {
    let pool = create_test_pool()
        .await
        .expect("Failed to create test pool");
    seed(&pool).await.expect("Failed to seed directory");
    Arc::new(Database::new(pool))
}

fn set(ids: &[i64]) -> BTreeSet<i64> {
    ids.iter().copied().collect()
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn database_health_check() {
    let db = seeded_database().await;
    db.health_check().await.expect("health check failed");
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn database_resolves_department_cascade() {
    let db = seeded_database().await;
    let resolver = ScopeResolver::new(db.clone());

    let scope = resolver
        .resolve(PG_DEPARTMENT, Role::Department)
        .await
        .unwrap();

    assert_eq!(scope.units(), &set(&[id(200)]));
    assert_eq!(scope.ids(OrgLevel::Department), &set(&[id(250)]));
    assert_eq!(scope.courses(), &set(&[id(300), id(301)]));
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn database_resolves_professor_courses_from_disciplines() {
    let db = seeded_database().await;
    let resolver = ScopeResolver::new(db.clone());

    let scope = resolver.resolve_stored(PG_PROFESSOR).await.unwrap();

    assert_eq!(scope.role(), Role::Professor);
    assert_eq!(scope.disciplines(), &set(&[id(401)]));
    assert_eq!(scope.courses(), &set(&[id(301)]));
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn database_placement_and_enrollment() {
    let db = seeded_database().await;

    let placement = db
        .placement(TargetKind::Student, id(501))
        .await
        .unwrap()
        .expect("student placed");
    assert_eq!(placement.course_id, Some(id(301)));
    assert_eq!(placement.unit_id, id(200));
    assert_eq!(placement.campus_id, id(100));

    let placement = db
        .placement(TargetKind::Unit, id(201))
        .await
        .unwrap()
        .expect("unit placed");
    assert_eq!(placement.course_id, None);
    assert_eq!(placement.campus_id, id(100));

    assert!(db
        .placement(TargetKind::Discipline, id(999))
        .await
        .unwrap()
        .is_none());

    assert!(db
        .is_enrolled_in_any(id(501), &set(&[id(400), id(401)]))
        .await
        .unwrap());
    assert!(!db
        .is_enrolled_in_any(id(500), &set(&[id(401)]))
        .await
        .unwrap());
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn database_enforces_coordinator_targets() {
    let db = seeded_database().await;
    let enforcer = AccessEnforcer::new(PermissionTable::new(), db.clone());
    let scope = enforcer
        .resolver()
        .resolve_stored(PG_COORDINATOR)
        .await
        .unwrap();

    enforcer
        .assert_target_access(&scope, TargetKind::Student, id(500))
        .await
        .unwrap();

    let err = enforcer
        .assert_target_access(&scope, TargetKind::Student, id(501))
        .await
        .unwrap_err();
    assert_eq!(err.forbidden_reason(), Some(ForbiddenReason::ScopeNotSatisfied));
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn database_lists_follow_scope_filters() {
    let db = seeded_database().await;
    let enforcer = AccessEnforcer::new(PermissionTable::new(), db.clone());
    let page = Page::new(100, 0);

    let professor = enforcer
        .resolver()
        .resolve_stored(PG_PROFESSOR)
        .await
        .unwrap();
    let filter = enforcer.scope_filter(&professor, TargetKind::Student);
    let students = db.list_students(&filter, page).await.unwrap();
    let ids: Vec<i64> = students.iter().map(|s| s.student_id).collect();
    assert_eq!(ids, vec![id(501)]);

    let department = enforcer
        .resolver()
        .resolve_stored(PG_DEPARTMENT)
        .await
        .unwrap();
    let filter = enforcer.scope_filter(&department, TargetKind::Course);
    let courses = db.list_courses(&filter, page).await.unwrap();
    let ids: Vec<i64> = courses.iter().map(|c| c.course_id).collect();
    assert_eq!(ids, vec![id(300), id(301)]);

    let only = set(&[id(401)]);
    let disciplines = db
        .list_course_disciplines(id(301), Some(&only), page)
        .await
        .unwrap();
    assert_eq!(disciplines.len(), 1);
    assert_eq!(disciplines[0].discipline_id, id(401));
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn database_lists_units_and_their_visible_courses() {
    let db = seeded_database().await;
    let enforcer = AccessEnforcer::new(PermissionTable::new(), db.clone());
    let page = Page::new(100, 0);

    let coordinator = enforcer
        .resolver()
        .resolve_stored(PG_COORDINATOR)
        .await
        .unwrap();

    let filter = enforcer.scope_filter(&coordinator, TargetKind::Unit);
    let units = db.list_units(&filter, page).await.unwrap();
    let ids: Vec<i64> = units.iter().map(|u| u.unit_id).collect();
    assert_eq!(ids, vec![id(200)]);
    assert!(units[0].courses.is_none());

    let filter = enforcer.scope_filter(&coordinator, TargetKind::Course);
    let courses = db
        .list_unit_courses(&set(&[id(200), id(201)]), &filter, page)
        .await
        .unwrap();
    let ids: Vec<i64> = courses.iter().map(|c| c.course_id).collect();
    assert_eq!(ids, vec![id(300)]);

    let department = enforcer
        .resolver()
        .resolve_stored(PG_DEPARTMENT)
        .await
        .unwrap();
    let filter = enforcer.scope_filter(&department, TargetKind::Course);
    let courses = db
        .list_unit_courses(&set(&[id(200)]), &filter, page)
        .await
        .unwrap();
    let ids: Vec<i64> = courses.iter().map(|c| c.course_id).collect();
    assert_eq!(ids, vec![id(300), id(301)]);
}
