// Integration tests for indy-migrate.
//
// Every scenario lives in `suite/`; this file only pulls them into one test binary.

mod suite;
