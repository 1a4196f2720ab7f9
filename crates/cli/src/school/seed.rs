//! Create and fill the sample school database.

use std::path::Path;

use rusqlite::{params, Connection};

/// How many program enrollments the seeded data covers.
pub const PROGRAM_ENROLLMENTS: i32 = 11;

const COURSES: i32 = 20;
const STAFF: i32 = 8;
const CLASSES: i32 = 40;
const ENROLLMENTS_PER_PROGRAM: i32 = 6;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS "Course" (
    "CourseID" INTEGER PRIMARY KEY,
    "Code" TEXT NOT NULL,
    "Name" TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS "Staff" (
    "StaffID" INTEGER PRIMARY KEY,
    "FirstName" TEXT NOT NULL,
    "LastName" TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS "Term" (
    "TermID" INTEGER PRIMARY KEY,
    "Code" TEXT NOT NULL,
    "Name" TEXT NOT NULL,
    "StartDate" TEXT NOT NULL,
    "EndDate" TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS "Class" (
    "ClassID" INTEGER PRIMARY KEY,
    "CourseID" INTEGER NOT NULL REFERENCES "Course",
    "Code" TEXT NOT NULL,
    "Section" TEXT NOT NULL,
    "InstructorStaffID" INTEGER REFERENCES "Staff"
);
CREATE TABLE IF NOT EXISTS "ClassEnrollment" (
    "ClassEnrollmentID" INTEGER PRIMARY KEY,
    "ClassID" INTEGER REFERENCES "Class",
    "ProgramEnrollmentID" INTEGER NOT NULL,
    "CourseID" INTEGER NOT NULL REFERENCES "Course",
    "TermID" INTEGER REFERENCES "Term"
);
CREATE INDEX IF NOT EXISTS "ClassEnrollment_ProgramEnrollmentID"
    ON "ClassEnrollment" ("ProgramEnrollmentID");
DELETE FROM "ClassEnrollment";
DELETE FROM "Class";
DELETE FROM "Term";
DELETE FROM "Staff";
DELETE FROM "Course";
"#;

const SUBJECTS: [&str; 5] = ["Algebra", "Biology", "Chemistry", "Drama", "Economics"];
const FIRST_NAMES: [&str; 4] = ["Ada", "Grace", "Alan", "Edsger"];
const LAST_NAMES: [&str; 4] = ["Lovelace", "Hopper", "Turing", "Dijkstra"];
const TERMS: [(&str, &str, &str, &str); 4] = [
    ("AU24", "Autumn 2024", "2024-09-02", "2024-12-20"),
    ("SP25", "Spring 2025", "2025-01-13", "2025-05-02"),
    ("SU25", "Summer 2025", "2025-06-02", "2025-08-15"),
    ("AU25", "Autumn 2025", "2025-09-01", "2025-12-19"),
];

/// Row counts of a seeded database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Seeded {
    pub courses: i32,
    pub staff: i32,
    pub terms: i32,
    pub classes: i32,
    pub class_enrollments: i32,
}

/// Create the schema in the database file, replacing any rows already there.
///
/// The data is deterministic. Some classes have no instructor, and some
/// enrollments have no class or no term, so the optional joins of the sample
/// queries are exercised.
pub fn seed(path: &Path) -> rusqlite::Result<Seeded> {
    let mut connection = Connection::open(path)?;
    connection.execute_batch(SCHEMA)?;

    let transaction = connection.transaction()?;
    {
        let mut insert = transaction.prepare(r#"INSERT INTO "Course" VALUES (?1, ?2, ?3)"#)?;
        for id in 1..=COURSES {
            let subject = SUBJECTS[usize::try_from(id).unwrap_or(0) % SUBJECTS.len()];
            let level = 100 + (id - 1) / 5 * 100;
            insert.execute(params![id, format!("{}{level}", &subject[..3]), format!("{subject} {level}")])?;
        }

        let mut insert = transaction.prepare(r#"INSERT INTO "Staff" VALUES (?1, ?2, ?3)"#)?;
        for id in 1..=STAFF {
            let index = usize::try_from(id).unwrap_or(0);
            insert.execute(params![
                id,
                FIRST_NAMES[index % FIRST_NAMES.len()],
                LAST_NAMES[(index / 2) % LAST_NAMES.len()]
            ])?;
        }

        let mut insert = transaction.prepare(r#"INSERT INTO "Term" VALUES (?1, ?2, ?3, ?4, ?5)"#)?;
        for (id, (code, name, start, end)) in (1..).zip(TERMS) {
            insert.execute(params![id, code, name, start, end])?;
        }

        let mut insert = transaction.prepare(r#"INSERT INTO "Class" VALUES (?1, ?2, ?3, ?4, ?5)"#)?;
        for id in 1..=CLASSES {
            let course = (id - 1) % COURSES + 1;
            let instructor = (id % 7 != 0).then_some((id - 1) % STAFF + 1);
            let section = if id > COURSES { "B" } else { "A" };
            insert.execute(params![id, course, format!("C{id:03}"), section, instructor])?;
        }

        let mut insert =
            transaction.prepare(r#"INSERT INTO "ClassEnrollment" VALUES (?1, ?2, ?3, ?4, ?5)"#)?;
        let mut id = 0;
        for program in 1..=PROGRAM_ENROLLMENTS {
            for slot in 0..ENROLLMENTS_PER_PROGRAM {
                id += 1;
                let class = (program * 3 + slot * 5) % CLASSES + 1;
                let course = (class - 1) % COURSES + 1;
                // not yet placed in a class
                let class = (id % 5 != 0).then_some(class);
                let term = (id % 4 != 0).then_some(id % 4);
                insert.execute(params![id, class, program, course, term])?;
            }
        }
    }
    transaction.commit()?;

    Ok(Seeded {
        courses: COURSES,
        staff: STAFF,
        terms: 4,
        classes: CLASSES,
        class_enrollments: PROGRAM_ENROLLMENTS * ENROLLMENTS_PER_PROGRAM,
    })
}
