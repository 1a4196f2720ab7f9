//! Query descriptors over the sample school database.

use query_engine_execution::backend::QueryContext;
use query_engine_execution::parameters::{NoParameters, SingleId};
use query_engine_execution::QueryDescriptor;
use query_engine_sql::sql::plan::QueryPlan;
use query_engine_sql::sql::string::SQL;

use super::models::{
    Class, ClassEnrollment, ClassEnrollmentDetails, Course, ProgramEnrollmentId, Staff, Term,
};

/// The flat row of the details query, before projection.
pub type ClassEnrollmentRow = (
    ClassEnrollment,
    Option<Course>,
    Option<Class>,
    Option<Term>,
    Option<Course>,
    Option<Staff>,
);

/// Every class enrollment of one program enrollment, with its required
/// course, class, term, the course the class teaches and its instructor.
///
/// Each optional part is preceded by a `test_` column read from its primary
/// key, which is null exactly when the join found nothing.
pub fn class_enrollment_details_by_program_enrollment(
) -> QueryDescriptor<SingleId<ProgramEnrollmentId>, ClassEnrollmentRow, ClassEnrollmentDetails> {
    QueryDescriptor::describe_projected(
        |context: &dyn QueryContext, parameters: &SingleId<ProgramEnrollmentId>| {
            let mut sql = SQL::new(context.dialect());
            sql.append_syntax(
                r#"SELECT
    ce."ClassEnrollmentID", ce."ClassID", ce."ProgramEnrollmentID", ce."CourseID", ce."TermID",
    rcr."CourseID" AS "test_rcr", rcr."CourseID", rcr."Code", rcr."Name",
    cl."ClassID" AS "test_cl", cl."ClassID", cl."CourseID", cl."Code", cl."Section",
    tm."TermID" AS "test_tm", tm."TermID", tm."Code", tm."Name", tm."StartDate", tm."EndDate",
    cr."CourseID" AS "test_cr", cr."CourseID", cr."Code", cr."Name",
    ins."StaffID" AS "test_ins", ins."StaffID", ins."FirstName", ins."LastName"
FROM "ClassEnrollment" ce
LEFT JOIN "Course" rcr ON rcr."CourseID" = ce."CourseID"
LEFT JOIN "Class" cl ON cl."ClassID" = ce."ClassID"
LEFT JOIN "Term" tm ON tm."TermID" = ce."TermID"
LEFT JOIN "Course" cr ON cr."CourseID" = cl."CourseID"
LEFT JOIN "Staff" ins ON ins."StaffID" = cl."InstructorStaffID"
WHERE ce."ProgramEnrollmentID" = "#,
            );
            sql.append_value(parameters.id().0);
            sql.append_syntax(r#" ORDER BY ce."ClassEnrollmentID""#);
            sql.into()
        },
        |(enrollment, required_course, class, term, class_course, instructor)| {
            ClassEnrollmentDetails {
                enrollment,
                required_course,
                class,
                term,
                class_course,
                instructor,
            }
        },
    )
}

/// Every course, by id.
pub fn all_courses() -> QueryDescriptor<NoParameters, Course> {
    QueryDescriptor::describe(|context: &dyn QueryContext, _: &NoParameters| {
        QueryPlan::raw(
            context.dialect(),
            r#"SELECT "CourseID", "Code", "Name" FROM "Course" ORDER BY "CourseID""#,
        )
    })
}

#[cfg(test)]
mod tests {
    use query_engine_execution::metrics::Metrics;
    use query_engine_execution::rusqlite_backend::RusqliteSession;
    use query_engine_execution::sqlx_backend::SqliteSession;
    use query_engine_execution::{
        AsyncQueryExecutor, ExecutionEnvironment, NativeAsyncExecutor, SynchronousExecutor,
    };

    use super::*;
    use crate::school::models::CourseId;
    use crate::school::seed;

    fn environment() -> ExecutionEnvironment {
        ExecutionEnvironment::new(Metrics::unregistered().unwrap())
    }

    #[test]
    fn details_fill_only_the_joins_that_matched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("school.sqlite");
        seed::seed(&path).unwrap();

        let executor = SynchronousExecutor::new(environment());
        let mut all = vec![];
        for program in 1..=seed::PROGRAM_ENROLLMENTS {
            let rows = executor
                .execute_sync(
                    || RusqliteSession::read_only(&path),
                    &class_enrollment_details_by_program_enrollment(),
                    SingleId(ProgramEnrollmentId(program)),
                    Some(1),
                )
                .unwrap();
            assert!(rows
                .iter()
                .all(|row| row.enrollment.program_enrollment_id == ProgramEnrollmentId(program)));
            all.extend(rows);
        }

        assert_eq!(all.len(), 66);
        for row in &all {
            assert_eq!(row.class.is_some(), row.enrollment.class_id.is_some());
            assert_eq!(row.term.is_some(), row.enrollment.term_id.is_some());
            assert_eq!(row.class_course.is_some(), row.class.is_some());
            assert_eq!(
                row.required_course.as_ref().map(|course| course.id),
                Some(row.enrollment.course_id)
            );
            if let Some(class) = &row.class {
                assert_eq!(Some(class.id), row.enrollment.class_id);
            }
        }
        assert!(all.iter().any(|row| row.class.is_some() && row.instructor.is_none()));
        assert!(all.iter().any(|row| row.instructor.is_some()));

        // one plan serves every program enrollment
        assert_eq!(executor.environment().plans.stats().builds, 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn both_executors_agree_on_courses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("school.sqlite");
        seed::seed(&path).unwrap();

        let uri = format!("sqlite://{}", path.display());
        let native = NativeAsyncExecutor::current(environment())
            .execute(|| SqliteSession::new(uri), &all_courses(), NoParameters, None)
            .await
            .unwrap();
        let synchronous = SynchronousExecutor::new(environment())
            .execute_sync(|| RusqliteSession::new(&path), &all_courses(), NoParameters, None)
            .unwrap();

        assert_eq!(native.len(), 20);
        assert_eq!(native[0].id, CourseId(1));
        similar_asserts::assert_eq!(native, synchronous);
    }
}
