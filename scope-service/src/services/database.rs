//! PostgreSQL organization directory and record store.
//!
//! Read-only: hierarchy and affiliation tables are maintained by external
//! administrative flows. Every sqlx failure surfaces as
//! [`AccessError::DirectoryUnavailable`].

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::{Postgres, QueryBuilder};
use std::collections::BTreeSet;

use super::directory::{Directory, Page, RecordStore};
use super::error::AccessError;
use super::filter::ScopeFilter;
use crate::models::{
    AffiliationRow, CourseSummary, DisciplineSummary, Edge, Placement, Role, StudentRecord,
    StudentSummary, TargetKind, UnitSummary,
};

/// PostgreSQL database wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

/// Column expressions a [`ScopeFilter`] constrains for one record kind.
///
/// Entries starting with `EXISTS` are correlated subquery prefixes, closed with
/// `))` after the bound id array.
struct FilterColumns {
    campus: &'static str,
    unit: &'static str,
    course: &'static str,
    disciplines: &'static str,
    students: &'static str,
}

const UNIT_COLUMNS: FilterColumns = FilterColumns {
    campus: "un.campus_id",
    unit: "un.unit_id",
    course: "EXISTS (SELECT 1 FROM courses uc \
             WHERE uc.unit_id = un.unit_id AND uc.course_id = ANY(",
    disciplines: "EXISTS (SELECT 1 FROM disciplines ud \
                  JOIN courses uc ON uc.course_id = ud.course_id \
                  WHERE uc.unit_id = un.unit_id AND ud.discipline_id = ANY(",
    students: "EXISTS (SELECT 1 FROM students us \
               JOIN courses uc ON uc.course_id = us.course_id \
               WHERE uc.unit_id = un.unit_id AND us.student_id = ANY(",
};

const STUDENT_COLUMNS: FilterColumns = FilterColumns {
    campus: "u.campus_id",
    unit: "c.unit_id",
    course: "s.course_id",
    disciplines: "EXISTS (SELECT 1 FROM student_disciplines sd \
                  WHERE sd.student_id = s.student_id AND sd.discipline_id = ANY(",
    students: "s.student_id",
};

const COURSE_COLUMNS: FilterColumns = FilterColumns {
    campus: "u.campus_id",
    unit: "c.unit_id",
    course: "c.course_id",
    disciplines: "EXISTS (SELECT 1 FROM disciplines d \
                  WHERE d.course_id = c.course_id AND d.discipline_id = ANY(",
    students: "EXISTS (SELECT 1 FROM students s \
               WHERE s.course_id = c.course_id AND s.student_id = ANY(",
};

const DISCIPLINE_COLUMNS: FilterColumns = FilterColumns {
    campus: "u.campus_id",
    unit: "c.unit_id",
    course: "d.course_id",
    disciplines: "d.discipline_id",
    students: "EXISTS (SELECT 1 FROM student_disciplines sd \
               WHERE sd.discipline_id = d.discipline_id AND sd.student_id = ANY(",
};

/// Append the condition for `filter`, introduced by `keyword` (` WHERE ` or
/// ` AND `). `Unrestricted` appends nothing; callers return early on `Nothing`.
fn push_filter(
    qb: &mut QueryBuilder<'_, Postgres>,
    keyword: &str,
    filter: &ScopeFilter,
    cols: &FilterColumns,
) {
    let (expr, ids) = match filter {
        ScopeFilter::Unrestricted | ScopeFilter::Nothing => return,
        ScopeFilter::Campuses(ids) => (cols.campus, ids),
        ScopeFilter::Units(ids) => (cols.unit, ids),
        ScopeFilter::Courses(ids) => (cols.course, ids),
        ScopeFilter::Disciplines(ids) => (cols.disciplines, ids),
        ScopeFilter::Students(ids) => (cols.students, ids),
    };
    let ids: Vec<i64> = ids.iter().copied().collect();

    qb.push(keyword);
    if expr.starts_with("EXISTS") {
        qb.push(expr).push_bind(ids).push("))");
    } else {
        qb.push(expr).push(" = ANY(").push_bind(ids).push(")");
    }
}

fn push_page(qb: &mut QueryBuilder<'_, Postgres>, order_by: &str, page: Page) {
    qb.push(" ORDER BY ")
        .push(order_by)
        .push(" LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset);
}

fn affiliation_query(role: Role) -> Option<&'static str> {
    let sql = match role {
        Role::Admin => return None,
        Role::Rectory => {
            "SELECT campus_id AS primary_id, NULL::BIGINT AS secondary_id \
             FROM rectory_affiliations WHERE user_id = $1"
        }
        Role::ProRectory => {
            "SELECT campus_id AS primary_id, pro_rectory_id AS secondary_id \
             FROM pro_rectory_affiliations WHERE user_id = $1"
        }
        Role::Department => {
            "SELECT unit_id AS primary_id, department_id AS secondary_id \
             FROM department_affiliations WHERE user_id = $1"
        }
        Role::Coordination => {
            "SELECT unit_id AS primary_id, course_id AS secondary_id \
             FROM coordination_affiliations WHERE user_id = $1"
        }
        Role::Professor => {
            "SELECT unit_id AS primary_id, discipline_id AS secondary_id \
             FROM professor_affiliations WHERE user_id = $1"
        }
        Role::Student => {
            "SELECT unit_id AS primary_id, student_id AS secondary_id \
             FROM student_affiliations WHERE user_id = $1"
        }
    };
    Some(sql)
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Directory for Database {
    async fn health_check(&self) -> Result<(), AccessError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Database health check failed: {}", e);
                AccessError::from(e)
            })?;
        Ok(())
    }

    async fn find_user_role_code(&self, user_id: i64) -> Result<Option<i32>, AccessError> {
        let code = sqlx::query_scalar::<_, i32>("SELECT role_code FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(code)
    }

    async fn affiliations(
        &self,
        user_id: i64,
        role: Role,
    ) -> Result<Vec<AffiliationRow>, AccessError> {
        let Some(sql) = affiliation_query(role) else {
            return Ok(Vec::new());
        };
        let rows = sqlx::query_as::<_, AffiliationRow>(sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn expand(&self, edge: Edge, ids: &BTreeSet<i64>) -> Result<BTreeSet<i64>, AccessError> {
        let sql = match edge {
            Edge::CampusUnits => "SELECT unit_id FROM units WHERE campus_id = ANY($1)",
            Edge::UnitCourses => "SELECT course_id FROM courses WHERE unit_id = ANY($1)",
            Edge::DisciplineCourses => {
                "SELECT DISTINCT course_id FROM disciplines WHERE discipline_id = ANY($1)"
            }
        };
        let ids: Vec<i64> = ids.iter().copied().collect();
        let expanded = sqlx::query_scalar::<_, i64>(sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(expanded.into_iter().collect())
    }

    async fn placement(&self, kind: TargetKind, id: i64) -> Result<Option<Placement>, AccessError> {
        let sql = match kind {
            TargetKind::Unit => {
                r#"
                SELECT NULL::BIGINT AS course_id, u.unit_id, u.campus_id
                FROM units u
                WHERE u.unit_id = $1
                "#
            }
            TargetKind::Student => {
                r#"
                SELECT c.course_id, c.unit_id, u.campus_id
                FROM students s
                JOIN courses c ON c.course_id = s.course_id
                JOIN units u ON u.unit_id = c.unit_id
                WHERE s.student_id = $1
                "#
            }
            TargetKind::Course => {
                r#"
                SELECT c.course_id, c.unit_id, u.campus_id
                FROM courses c
                JOIN units u ON u.unit_id = c.unit_id
                WHERE c.course_id = $1
                "#
            }
            TargetKind::Discipline => {
                r#"
                SELECT c.course_id, c.unit_id, u.campus_id
                FROM disciplines d
                JOIN courses c ON c.course_id = d.course_id
                JOIN units u ON u.unit_id = c.unit_id
                WHERE d.discipline_id = $1
                "#
            }
        };
        let placement = sqlx::query_as::<_, Placement>(sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(placement)
    }

    async fn is_enrolled_in_any(
        &self,
        student_id: i64,
        discipline_ids: &BTreeSet<i64>,
    ) -> Result<bool, AccessError> {
        let ids: Vec<i64> = discipline_ids.iter().copied().collect();
        let enrolled = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM student_disciplines
                WHERE student_id = $1 AND discipline_id = ANY($2)
            )
            "#,
        )
        .bind(student_id)
        .bind(ids)
        .fetch_one(&self.pool)
        .await?;
        Ok(enrolled)
    }
}

#[async_trait]
impl RecordStore for Database {
    async fn find_student(&self, student_id: i64) -> Result<Option<StudentRecord>, AccessError> {
        let record = sqlx::query_as::<_, StudentRecord>(
            r#"
            SELECT s.student_id, s.course_id, c.unit_id, u.campus_id, s.classification
            FROM students s
            JOIN courses c ON c.course_id = s.course_id
            JOIN units u ON u.unit_id = c.unit_id
            WHERE s.student_id = $1
            "#,
        )
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn list_students(
        &self,
        filter: &ScopeFilter,
        page: Page,
    ) -> Result<Vec<StudentSummary>, AccessError> {
        if filter.is_nothing() {
            return Ok(Vec::new());
        }
        let mut qb = QueryBuilder::new(
            "SELECT s.student_id, s.course_id FROM students s \
             JOIN courses c ON c.course_id = s.course_id \
             JOIN units u ON u.unit_id = c.unit_id",
        );
        push_filter(&mut qb, " WHERE ", filter, &STUDENT_COLUMNS);
        push_page(&mut qb, "s.student_id", page);

        let rows = qb
            .build_query_as::<StudentSummary>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn list_units(
        &self,
        filter: &ScopeFilter,
        page: Page,
    ) -> Result<Vec<UnitSummary>, AccessError> {
        if filter.is_nothing() {
            return Ok(Vec::new());
        }
        let mut qb = QueryBuilder::new("SELECT un.unit_id, un.campus_id, un.unit_name FROM units un");
        push_filter(&mut qb, " WHERE ", filter, &UNIT_COLUMNS);
        push_page(&mut qb, "un.unit_id", page);

        let rows = qb
            .build_query_as::<UnitSummary>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn list_courses(
        &self,
        filter: &ScopeFilter,
        page: Page,
    ) -> Result<Vec<CourseSummary>, AccessError> {
        if filter.is_nothing() {
            return Ok(Vec::new());
        }
        let mut qb = QueryBuilder::new(
            "SELECT c.course_id, c.unit_id, u.campus_id, c.course_name FROM courses c \
             JOIN units u ON u.unit_id = c.unit_id",
        );
        push_filter(&mut qb, " WHERE ", filter, &COURSE_COLUMNS);
        push_page(&mut qb, "c.course_id", page);

        let rows = qb
            .build_query_as::<CourseSummary>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn list_unit_courses(
        &self,
        unit_ids: &BTreeSet<i64>,
        filter: &ScopeFilter,
        page: Page,
    ) -> Result<Vec<CourseSummary>, AccessError> {
        if filter.is_nothing() || unit_ids.is_empty() {
            return Ok(Vec::new());
        }
        let unit_ids: Vec<i64> = unit_ids.iter().copied().collect();
        let mut qb = QueryBuilder::new(
            "SELECT c.course_id, c.unit_id, u.campus_id, c.course_name FROM courses c \
             JOIN units u ON u.unit_id = c.unit_id WHERE c.unit_id = ANY(",
        );
        qb.push_bind(unit_ids).push(")");
        push_filter(&mut qb, " AND ", filter, &COURSE_COLUMNS);
        push_page(&mut qb, "c.unit_id, c.course_id", page);

        let rows = qb
            .build_query_as::<CourseSummary>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn list_disciplines(
        &self,
        filter: &ScopeFilter,
        page: Page,
    ) -> Result<Vec<DisciplineSummary>, AccessError> {
        if filter.is_nothing() {
            return Ok(Vec::new());
        }
        let mut qb = QueryBuilder::new(
            "SELECT d.discipline_id, d.course_id, d.discipline_name FROM disciplines d \
             JOIN courses c ON c.course_id = d.course_id \
             JOIN units u ON u.unit_id = c.unit_id",
        );
        push_filter(&mut qb, " WHERE ", filter, &DISCIPLINE_COLUMNS);
        push_page(&mut qb, "d.discipline_id", page);

        let rows = qb
            .build_query_as::<DisciplineSummary>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn list_course_disciplines(
        &self,
        course_id: i64,
        only: Option<&BTreeSet<i64>>,
        page: Page,
    ) -> Result<Vec<DisciplineSummary>, AccessError> {
        let only: Option<Vec<i64>> = only.map(|ids| ids.iter().copied().collect());
        let rows = sqlx::query_as::<_, DisciplineSummary>(
            r#"
            SELECT discipline_id, course_id, discipline_name
            FROM disciplines
            WHERE course_id = $1 AND ($2::BIGINT[] IS NULL OR discipline_id = ANY($2))
            ORDER BY discipline_id
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(course_id)
        .bind(only)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
