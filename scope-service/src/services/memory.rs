//! In-memory organization directory.
//!
//! Backs tests without PostgreSQL. Records every lookup it serves so callers
//! can assert how many round trips a resolution cost. Compiled only for tests
//! and under the `test-utils` feature.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, RwLock};

use super::directory::{Directory, Page, RecordStore};
use super::error::AccessError;
use super::filter::ScopeFilter;
use crate::models::{
    AffiliationRow, CourseSummary, DisciplineSummary, Edge, Placement, Role, StudentRecord,
    StudentSummary, TargetKind, UnitSummary,
};

#[derive(Debug, Default)]
struct OrgData {
    campuses: BTreeSet<i64>,
    /// unit -> campus
    units: BTreeMap<i64, i64>,
    unit_names: BTreeMap<i64, String>,
    /// course -> (unit, name)
    courses: BTreeMap<i64, (i64, String)>,
    /// department -> unit
    departments: BTreeMap<i64, i64>,
    /// discipline -> (course, name)
    disciplines: BTreeMap<i64, (i64, String)>,
    /// student -> (course, classification)
    students: BTreeMap<i64, (i64, Option<String>)>,
    /// (student, discipline)
    enrollments: BTreeSet<(i64, i64)>,
    /// user -> stored role code
    users: BTreeMap<i64, i32>,
    affiliations: BTreeMap<(i64, Role), Vec<AffiliationRow>>,
}

impl OrgData {
    fn course_placement(&self, course_id: i64) -> Option<Placement> {
        let (unit_id, _) = self.courses.get(&course_id)?;
        let campus_id = self.units.get(unit_id)?;
        Some(Placement {
            course_id: Some(course_id),
            unit_id: *unit_id,
            campus_id: *campus_id,
        })
    }

    fn placement(&self, kind: TargetKind, id: i64) -> Option<Placement> {
        let course_id = match kind {
            TargetKind::Unit => {
                let campus_id = self.units.get(&id)?;
                return Some(Placement {
                    course_id: None,
                    unit_id: id,
                    campus_id: *campus_id,
                });
            }
            TargetKind::Student => self.students.get(&id).map(|(course, _)| *course)?,
            TargetKind::Course => id,
            TargetKind::Discipline => self.disciplines.get(&id).map(|(course, _)| *course)?,
        };
        self.course_placement(course_id)
    }

    fn placed_within(&self, filter: &ScopeFilter, placement: Option<Placement>) -> Option<bool> {
        let placement = placement?;
        match filter {
            ScopeFilter::Campuses(ids) => Some(ids.contains(&placement.campus_id)),
            ScopeFilter::Units(ids) => Some(ids.contains(&placement.unit_id)),
            ScopeFilter::Courses(ids) => Some(
                placement
                    .course_id
                    .is_some_and(|course_id| ids.contains(&course_id)),
            ),
            _ => None,
        }
    }

    fn unit_of_course(&self, course_id: i64) -> Option<i64> {
        self.courses.get(&course_id).map(|(unit, _)| *unit)
    }

    fn unit_visible(&self, filter: &ScopeFilter, unit_id: i64) -> bool {
        match filter {
            ScopeFilter::Unrestricted => true,
            ScopeFilter::Nothing => false,
            ScopeFilter::Campuses(ids) => self.units.get(&unit_id).is_some_and(|c| ids.contains(c)),
            ScopeFilter::Units(ids) => ids.contains(&unit_id),
            ScopeFilter::Courses(ids) => ids
                .iter()
                .any(|c| self.unit_of_course(*c) == Some(unit_id)),
            ScopeFilter::Disciplines(ids) => ids.iter().any(|d| {
                self.disciplines
                    .get(d)
                    .and_then(|(course, _)| self.unit_of_course(*course))
                    == Some(unit_id)
            }),
            ScopeFilter::Students(ids) => ids.iter().any(|s| {
                self.students
                    .get(s)
                    .and_then(|(course, _)| self.unit_of_course(*course))
                    == Some(unit_id)
            }),
        }
    }

    fn course_summary(&self, course_id: i64) -> Option<CourseSummary> {
        let (_, name) = self.courses.get(&course_id)?;
        let placement = self.course_placement(course_id)?;
        Some(CourseSummary {
            course_id,
            unit_id: placement.unit_id,
            campus_id: placement.campus_id,
            course_name: name.clone(),
        })
    }

    fn student_visible(&self, filter: &ScopeFilter, student_id: i64) -> bool {
        match filter {
            ScopeFilter::Unrestricted => true,
            ScopeFilter::Nothing => false,
            ScopeFilter::Disciplines(ids) => ids
                .iter()
                .any(|d| self.enrollments.contains(&(student_id, *d))),
            ScopeFilter::Students(ids) => ids.contains(&student_id),
            _ => self
                .placed_within(filter, self.placement(TargetKind::Student, student_id))
                .unwrap_or(false),
        }
    }

    fn course_visible(&self, filter: &ScopeFilter, course_id: i64) -> bool {
        match filter {
            ScopeFilter::Unrestricted => true,
            ScopeFilter::Nothing => false,
            ScopeFilter::Disciplines(ids) => ids.iter().any(|d| {
                self.disciplines
                    .get(d)
                    .is_some_and(|(course, _)| *course == course_id)
            }),
            ScopeFilter::Students(ids) => ids.iter().any(|s| {
                self.students
                    .get(s)
                    .is_some_and(|(course, _)| *course == course_id)
            }),
            _ => self
                .placed_within(filter, self.course_placement(course_id))
                .unwrap_or(false),
        }
    }

    fn discipline_visible(&self, filter: &ScopeFilter, discipline_id: i64) -> bool {
        match filter {
            ScopeFilter::Unrestricted => true,
            ScopeFilter::Nothing => false,
            ScopeFilter::Disciplines(ids) => ids.contains(&discipline_id),
            ScopeFilter::Students(ids) => ids
                .iter()
                .any(|s| self.enrollments.contains(&(*s, discipline_id))),
            _ => self
                .placed_within(filter, self.placement(TargetKind::Discipline, discipline_id))
                .unwrap_or(false),
        }
    }
}

/// Thread-safe directory and record store held entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    data: RwLock<OrgData>,
    calls: Mutex<Vec<&'static str>>,
    unavailable: AtomicBool,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_campus(&self, campus_id: i64) -> &Self {
        self.write(|d| {
            d.campuses.insert(campus_id);
        })
    }

    pub fn add_unit(&self, unit_id: i64, campus_id: i64) -> &Self {
        self.write(|d| {
            d.campuses.insert(campus_id);
            d.units.insert(unit_id, campus_id);
        })
    }

    pub fn name_unit(&self, unit_id: i64, name: &str) -> &Self {
        self.write(|d| {
            d.unit_names.insert(unit_id, name.to_string());
        })
    }

    pub fn add_department(&self, department_id: i64, unit_id: i64) -> &Self {
        self.write(|d| {
            d.departments.insert(department_id, unit_id);
        })
    }

    pub fn add_course(&self, course_id: i64, unit_id: i64, name: &str) -> &Self {
        self.write(|d| {
            d.courses.insert(course_id, (unit_id, name.to_string()));
        })
    }

    pub fn add_discipline(&self, discipline_id: i64, course_id: i64, name: &str) -> &Self {
        self.write(|d| {
            d.disciplines
                .insert(discipline_id, (course_id, name.to_string()));
        })
    }

    pub fn add_student(&self, student_id: i64, course_id: i64) -> &Self {
        self.write(|d| {
            d.students.insert(student_id, (course_id, None));
        })
    }

    pub fn classify_student(&self, student_id: i64, classification: &str) -> &Self {
        self.write(|d| {
            if let Some(entry) = d.students.get_mut(&student_id) {
                entry.1 = Some(classification.to_string());
            }
        })
    }

    pub fn enroll(&self, student_id: i64, discipline_id: i64) -> &Self {
        self.write(|d| {
            d.enrollments.insert((student_id, discipline_id));
        })
    }

    /// Register a user with a raw stored role code, valid or not.
    pub fn add_user_with_code(&self, user_id: i64, role_code: i32) -> &Self {
        self.write(|d| {
            d.users.insert(user_id, role_code);
        })
    }

    pub fn add_user(&self, user_id: i64, role: Role) -> &Self {
        self.add_user_with_code(user_id, role.code())
    }

    pub fn affiliate(&self, user_id: i64, role: Role, primary: i64, secondary: Option<i64>) -> &Self {
        self.write(|d| {
            d.affiliations
                .entry((user_id, role))
                .or_default()
                .push(AffiliationRow::new(primary, secondary));
        })
    }

    pub fn clear_affiliations(&self, user_id: i64, role: Role) -> &Self {
        self.write(|d| {
            d.affiliations.remove(&(user_id, role));
        })
    }

    /// Make every subsequent lookup fail as if the backing store were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Names of the lookups served so far, in order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }

    pub fn reset_calls(&self) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.clear();
        }
    }

    fn write(&self, f: impl FnOnce(&mut OrgData)) -> &Self {
        match self.data.write() {
            Ok(mut data) => f(&mut data),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
        self
    }

    fn read<T>(&self, call: &'static str, f: impl FnOnce(&OrgData) -> T) -> Result<T, AccessError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AccessError::DirectoryUnavailable(anyhow::anyhow!(
                "In-memory directory marked unavailable"
            )));
        }
        let data = self
            .data
            .read()
            .map_err(|e| AccessError::DirectoryUnavailable(anyhow::anyhow!("Directory lock poisoned: {}", e)))?;
        Ok(f(&data))
    }
}

fn paginate<T>(items: impl Iterator<Item = T>, page: Page) -> Vec<T> {
    items
        .skip(page.offset as usize)
        .take(page.limit as usize)
        .collect()
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn health_check(&self) -> Result<(), AccessError> {
        self.read("health_check", |_| ())
    }

    async fn find_user_role_code(&self, user_id: i64) -> Result<Option<i32>, AccessError> {
        self.read("find_user_role_code", |d| d.users.get(&user_id).copied())
    }

    async fn affiliations(
        &self,
        user_id: i64,
        role: Role,
    ) -> Result<Vec<AffiliationRow>, AccessError> {
        self.read("affiliations", |d| {
            d.affiliations
                .get(&(user_id, role))
                .cloned()
                .unwrap_or_default()
        })
    }

    async fn expand(&self, edge: Edge, ids: &BTreeSet<i64>) -> Result<BTreeSet<i64>, AccessError> {
        self.read("expand", |d| match edge {
            Edge::CampusUnits => d
                .units
                .iter()
                .filter(|(_, campus)| ids.contains(campus))
                .map(|(unit, _)| *unit)
                .collect(),
            Edge::UnitCourses => d
                .courses
                .iter()
                .filter(|(_, (unit, _))| ids.contains(unit))
                .map(|(course, _)| *course)
                .collect(),
            Edge::DisciplineCourses => d
                .disciplines
                .iter()
                .filter(|(discipline, _)| ids.contains(discipline))
                .map(|(_, (course, _))| *course)
                .collect(),
        })
    }

    async fn placement(&self, kind: TargetKind, id: i64) -> Result<Option<Placement>, AccessError> {
        self.read("placement", |d| d.placement(kind, id))
    }

    async fn is_enrolled_in_any(
        &self,
        student_id: i64,
        discipline_ids: &BTreeSet<i64>,
    ) -> Result<bool, AccessError> {
        self.read("is_enrolled_in_any", |d| {
            discipline_ids
                .iter()
                .any(|discipline| d.enrollments.contains(&(student_id, *discipline)))
        })
    }
}

#[async_trait]
impl RecordStore for InMemoryDirectory {
    async fn find_student(&self, student_id: i64) -> Result<Option<StudentRecord>, AccessError> {
        self.read("find_student", |d| {
            let (course_id, classification) = d.students.get(&student_id)?;
            let placement = d.course_placement(*course_id)?;
            Some(StudentRecord {
                student_id,
                course_id: *course_id,
                unit_id: placement.unit_id,
                campus_id: placement.campus_id,
                classification: classification.clone(),
            })
        })
    }

    async fn list_students(
        &self,
        filter: &ScopeFilter,
        page: Page,
    ) -> Result<Vec<StudentSummary>, AccessError> {
        if filter.is_nothing() {
            return Ok(Vec::new());
        }
        self.read("list_students", |d| {
            paginate(
                d.students
                    .iter()
                    .filter(|(id, _)| d.student_visible(filter, **id))
                    .map(|(id, (course, _))| StudentSummary {
                        student_id: *id,
                        course_id: *course,
                    }),
                page,
            )
        })
    }

    async fn list_units(
        &self,
        filter: &ScopeFilter,
        page: Page,
    ) -> Result<Vec<UnitSummary>, AccessError> {
        if filter.is_nothing() {
            return Ok(Vec::new());
        }
        self.read("list_units", |d| {
            paginate(
                d.units
                    .iter()
                    .filter(|(id, _)| d.unit_visible(filter, **id))
                    .map(|(id, campus)| UnitSummary {
                        unit_id: *id,
                        campus_id: *campus,
                        unit_name: d.unit_names.get(id).cloned().unwrap_or_default(),
                        courses: None,
                    }),
                page,
            )
        })
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
        self.read("list_unit_courses", |d| {
            let mut courses: Vec<CourseSummary> = d
                .courses
                .iter()
                .filter(|(id, (unit, _))| unit_ids.contains(unit) && d.course_visible(filter, **id))
                .filter_map(|(id, _)| d.course_summary(*id))
                .collect();
            courses.sort_by_key(|c| (c.unit_id, c.course_id));
            paginate(courses.into_iter(), page)
        })
    }

    async fn list_courses(
        &self,
        filter: &ScopeFilter,
        page: Page,
    ) -> Result<Vec<CourseSummary>, AccessError> {
        if filter.is_nothing() {
            return Ok(Vec::new());
        }
        self.read("list_courses", |d| {
            paginate(
                d.courses
                    .iter()
                    .filter(|(id, _)| d.course_visible(filter, **id))
                    .filter_map(|(id, _)| d.course_summary(*id)),
                page,
            )
        })
    }

    async fn list_disciplines(
        &self,
        filter: &ScopeFilter,
        page: Page,
    ) -> Result<Vec<DisciplineSummary>, AccessError> {
        if filter.is_nothing() {
            return Ok(Vec::new());
        }
        self.read("list_disciplines", |d| {
            paginate(
                d.disciplines
                    .iter()
                    .filter(|(id, _)| d.discipline_visible(filter, **id))
                    .map(|(id, (course, name))| DisciplineSummary {
                        discipline_id: *id,
                        course_id: *course,
                        discipline_name: name.clone(),
                    }),
                page,
            )
        })
    }

    async fn list_course_disciplines(
        &self,
        course_id: i64,
        only: Option<&BTreeSet<i64>>,
        page: Page,
    ) -> Result<Vec<DisciplineSummary>, AccessError> {
        self.read("list_course_disciplines", |d| {
            paginate(
                d.disciplines
                    .iter()
                    .filter(|(id, (course, _))| {
                        *course == course_id && only.map_or(true, |ids| ids.contains(id))
                    })
                    .map(|(id, (course, name))| DisciplineSummary {
                        discipline_id: *id,
                        course_id: *course,
                        discipline_name: name.clone(),
                    }),
                page,
            )
        })
    }
}
