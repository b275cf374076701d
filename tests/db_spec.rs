use serde::{Deserialize, Serialize};
use speculate2::speculate;
use tribunal::db::Database;

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Sample {
    name: String,
    count: u32,
}

speculate! {
    before {
        let db = Database::open_memory().expect("Failed to create in-memory database");
        db.migrate().expect("Failed to run migrations");
    }

    describe "raw values" {
        it "returns None for a missing key" {
            assert!(db.get_raw("absent").expect("Query failed").is_none());
        }

        it "stores and overwrites a value" {
            db.put_raw("key", "first").expect("Write failed");
            db.put_raw("key", "second").expect("Write failed");

            assert_eq!(db.get_raw("key").unwrap().as_deref(), Some("second"));
        }

        it "deletes a value" {
            db.put_raw("key", "value").unwrap();

            assert!(db.delete("key").unwrap());
            assert!(!db.delete("key").unwrap());
            assert!(db.get_raw("key").unwrap().is_none());
        }
    }

    describe "json values" {
        it "saves and loads a typed value" {
            let sample = vec![Sample { name: "a".into(), count: 2 }];
            db.save("samples", &sample).unwrap();

            let loaded: Vec<Sample> = db.load("samples").unwrap().unwrap();
            assert_eq!(loaded, sample);
        }

        it "fails on a value of the wrong shape" {
            db.put_raw("samples", "{\"not\": \"a list\"}").unwrap();
            assert!(db.load::<Vec<Sample>>("samples").is_err());
        }

        it "shares the connection between clones" {
            let other = db.clone();
            other.save("shared", &Sample { name: "b".into(), count: 1 }).unwrap();

            assert!(db.load::<Sample>("shared").unwrap().is_some());
        }
    }

    describe "migrations" {
        it "can run twice" {
            db.migrate().expect("Second migration failed");
        }
    }
}
