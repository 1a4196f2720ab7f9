//! The sample school's domain types, mapped from its tables.

use query_engine_materialization::{named_row, scalar_newtype};

macro_rules! identifier {
    ($($ty:ident),+ $(,)?) => {
        $(
            #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
            pub struct $ty(pub i32);

            scalar_newtype!($ty(i32));
        )+
    };
}

identifier!(
    ClassId,
    ClassEnrollmentId,
    CourseId,
    ProgramEnrollmentId,
    StaffId,
    TermId,
);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Course {
    pub id: CourseId,
    pub code: String,
    pub name: String,
}

named_row!(Course {
    id as "CourseID": CourseId,
    code as "Code": String,
    name as "Name": String,
});

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Class {
    pub id: ClassId,
    pub course_id: CourseId,
    pub code: String,
    pub section: String,
}

named_row!(Class {
    id as "ClassID": ClassId,
    course_id as "CourseID": CourseId,
    code as "Code": String,
    section as "Section": String,
});

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Term {
    pub id: TermId,
    pub code: String,
    pub name: String,
    /// ISO 8601 date.
    pub start_date: String,
    pub end_date: String,
}

named_row!(Term {
    id as "TermID": TermId,
    code as "Code": String,
    name as "Name": String,
    start_date as "StartDate": String,
    end_date as "EndDate": String,
});

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Staff {
    pub id: StaffId,
    pub first_name: String,
    pub last_name: String,
}

named_row!(Staff {
    id as "StaffID": StaffId,
    first_name as "FirstName": String,
    last_name as "LastName": String,
});

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassEnrollment {
    pub id: ClassEnrollmentId,
    pub class_id: Option<ClassId>,
    pub program_enrollment_id: ProgramEnrollmentId,
    pub course_id: CourseId,
    pub term_id: Option<TermId>,
}

named_row!(ClassEnrollment {
    id as "ClassEnrollmentID": ClassEnrollmentId,
    class_id as "ClassID": Option<ClassId>,
    program_enrollment_id as "ProgramEnrollmentID": ProgramEnrollmentId,
    course_id as "CourseID": CourseId,
    term_id as "TermID": Option<TermId>,
});

/// One class enrollment with everything joined to it.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassEnrollmentDetails {
    pub enrollment: ClassEnrollment,
    /// The course the enrollment requires.
    pub required_course: Option<Course>,
    pub class: Option<Class>,
    pub term: Option<Term>,
    /// The course the class teaches.
    pub class_course: Option<Course>,
    pub instructor: Option<Staff>,
}
