use enrollment_service::db::Database;
use enrollment_service::models::*;
use enrollment_service::Error;
use speculate2::speculate;

fn create_test_student(db: &Database, email: &str) -> Student {
    db.create_student("Test Student", email, "$2b$04$not-a-real-hash")
        .expect("Failed to create student")
}

fn course_id(db: &Database, name: &str) -> CourseId {
    db.get_all_courses()
        .expect("Query failed")
        .into_iter()
        .find(|c| c.name == name)
        .map(|c| c.id)
        .expect("Course not seeded")
}

fn score(value: i64) -> Score {
    Score::new(value).expect("Score out of range")
}

speculate! {
    before {
        let db = Database::open_memory().expect("Failed to create in-memory database");
        db.migrate().expect("Failed to run migrations");
    }

    describe "students" {
        describe "create_student" {
            it "creates a student and assigns an id" {
                let student = db
                    .create_student("Ada Lovelace", "ada@example.com", "hash")
                    .expect("Failed to create student");

                assert_eq!(student.name, "Ada Lovelace");
                assert_eq!(student.email, "ada@example.com");
                assert!(student.id.get() > 0);
            }

            it "rejects a duplicate email" {
                create_test_student(&db, "ada@example.com");
                let result = db.create_student("Someone Else", "ada@example.com", "hash");
                assert!(matches!(result, Err(Error::DuplicateIdentity)));
            }

            it "treats emails differing in case as distinct" {
                create_test_student(&db, "ada@example.com");
                let result = db.create_student("Ada", "Ada@Example.com", "hash");
                assert!(result.is_ok());
            }
        }

        describe "get_student" {
            it "returns None for non-existent student" {
                let result = db.get_student(StudentId::new(999)).expect("Query failed");
                assert!(result.is_none());
            }

            it "returns the student by id" {
                let created = create_test_student(&db, "grace@example.com");
                let found = db.get_student(created.id).expect("Query failed");
                assert_eq!(found.map(|s| s.email), Some("grace@example.com".to_string()));
            }
        }

        describe "find_credentials" {
            it "returns the stored hash for a known email" {
                db.create_student("Ada", "ada@example.com", "stored-hash").expect("Failed to create");
                let (student, hash) = db
                    .find_credentials("ada@example.com")
                    .expect("Query failed")
                    .expect("Student not found");

                assert_eq!(student.email, "ada@example.com");
                assert_eq!(hash, "stored-hash");
            }

            it "returns None for an unknown email" {
                let found = db.find_credentials("nobody@example.com").expect("Query failed");
                assert!(found.is_none());
            }
        }
    }

    describe "courses" {
        describe "seed_courses" {
            it "inserts the five default courses" {
                let inserted = db.seed_courses().expect("Failed to seed");
                assert_eq!(inserted, 5);

                let names: Vec<String> = db
                    .get_all_courses()
                    .expect("Query failed")
                    .into_iter()
                    .map(|c| c.name)
                    .collect();
                assert_eq!(names, SEED_COURSES.iter().map(|n| n.to_string()).collect::<Vec<_>>());
            }

            it "is idempotent" {
                db.seed_courses().expect("Failed to seed");
                let inserted = db.seed_courses().expect("Failed to reseed");

                assert_eq!(inserted, 0);
                assert_eq!(db.get_all_courses().expect("Query failed").len(), 5);
            }

            it "starts every course at the default rating" {
                db.seed_courses().expect("Failed to seed");
                for course in db.get_all_courses().expect("Query failed") {
                    assert_eq!(course.rating, DEFAULT_COURSE_RATING);
                }
            }
        }

        describe "get_course" {
            it "returns None for non-existent course" {
                db.seed_courses().expect("Failed to seed");
                let result = db.get_course(CourseId::new(999)).expect("Query failed");
                assert!(result.is_none());
            }
        }
    }

    describe "enrollments" {
        before {
            db.seed_courses().expect("Failed to seed");
            let student = create_test_student(&db, "student@example.com");
        }

        it "enrolls a student in a course" {
            let math = course_id(&db, "Mathematics");
            let enrollment = db.create_enrollment(student.id, math).expect("Failed to enroll");

            assert_eq!(enrollment.student_id, student.id);
            assert_eq!(enrollment.course_id, math);
            assert!(!enrollment.is_rated());
        }

        it "rejects a second enrollment in the same course" {
            let math = course_id(&db, "Mathematics");
            db.create_enrollment(student.id, math).expect("Failed to enroll");

            let result = db.create_enrollment(student.id, math);
            assert!(matches!(result, Err(Error::AlreadyEnrolled)));
            assert_eq!(db.count_enrollments(student.id, math).expect("Query failed"), 1);
        }

        it "rejects an unknown course" {
            let result = db.create_enrollment(student.id, CourseId::new(999));
            assert!(matches!(result, Err(Error::CourseNotFound)));
        }

        it "lists enrollments in creation order with course state" {
            let physics = course_id(&db, "Physics");
            let math = course_id(&db, "Mathematics");
            db.create_enrollment(student.id, physics).expect("Failed to enroll");
            db.create_enrollment(student.id, math).expect("Failed to enroll");

            let views = db.get_enrollments_by_student(student.id).expect("Query failed");
            assert_eq!(views.len(), 2);
            assert_eq!(views[0].course_name, "Physics");
            assert_eq!(views[1].course_name, "Mathematics");
            assert!(views.iter().all(|v| v.rating.is_none()));
            assert!(views.iter().all(|v| v.course_rating == DEFAULT_COURSE_RATING));
        }

        it "lists nothing for a student without enrollments" {
            let other = create_test_student(&db, "other@example.com");
            let views = db.get_enrollments_by_student(other.id).expect("Query failed");
            assert!(views.is_empty());
        }

        it "does not show other students' enrollments" {
            let other = create_test_student(&db, "other@example.com");
            db.create_enrollment(other.id, course_id(&db, "Biology")).expect("Failed to enroll");

            let views = db.get_enrollments_by_student(student.id).expect("Query failed");
            assert!(views.is_empty());
        }
    }

    describe "ratings" {
        before {
            db.seed_courses().expect("Failed to seed");
            let math = course_id(&db, "Mathematics");
            let first = create_test_student(&db, "first@example.com");
            let second = create_test_student(&db, "second@example.com");
            db.create_enrollment(first.id, math).expect("Failed to enroll");
            db.create_enrollment(second.id, math).expect("Failed to enroll");
        }

        it "replaces the default with the first rating" {
            let outcome = db.rate_course(first.id, math, score(90)).expect("Failed to rate");

            assert_eq!(outcome.rating.get(), 90);
            assert_eq!(outcome.course_rating, 90.0);
            let course = db.get_course(math).expect("Query failed").expect("Course missing");
            assert_eq!(course.rating, 90.0);
        }

        it "averages ratings across students" {
            db.rate_course(first.id, math, score(90)).expect("Failed to rate");
            let outcome = db.rate_course(second.id, math, score(70)).expect("Failed to rate");

            assert_eq!(outcome.course_rating, 80.0);
        }

        it "keeps the mean exact for uneven totals" {
            db.rate_course(first.id, math, score(100)).expect("Failed to rate");
            let outcome = db.rate_course(second.id, math, score(61)).expect("Failed to rate");

            assert_eq!(outcome.course_rating, 80.5);
        }

        it "records the rating on the enrollment" {
            db.rate_course(first.id, math, score(0)).expect("Failed to rate");

            let enrollment = db
                .get_enrollment(first.id, math)
                .expect("Query failed")
                .expect("Enrollment missing");
            assert_eq!(enrollment.rating.map(Score::get), Some(0));
        }

        it "rejects a second rating and leaves the aggregate unchanged" {
            db.rate_course(first.id, math, score(90)).expect("Failed to rate");

            let result = db.rate_course(first.id, math, score(10));
            assert!(matches!(result, Err(Error::AlreadyRated)));

            let course = db.get_course(math).expect("Query failed").expect("Course missing");
            assert_eq!(course.rating, 90.0);
        }

        it "rejects rating a course the student is not enrolled in" {
            let physics = course_id(&db, "Physics");
            let result = db.rate_course(first.id, physics, score(50));
            assert!(matches!(result, Err(Error::NotEnrolled)));

            let course = db.get_course(physics).expect("Query failed").expect("Course missing");
            assert_eq!(course.rating, DEFAULT_COURSE_RATING);
        }

        it "does not touch other courses" {
            db.rate_course(first.id, math, score(10)).expect("Failed to rate");

            let biology = course_id(&db, "Biology");
            let course = db.get_course(biology).expect("Query failed").expect("Course missing");
            assert_eq!(course.rating, DEFAULT_COURSE_RATING);
        }
    }
}
