//! Nested statement validation
//!
//! Statements issued from inside a trigger body, directly or through a
//! procedure the body calls, are checked against the active trigger before
//! the engine runs them.

use crate::error::Result;

/// Statement type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StmtType {
    Select,
    Insert,
    Update,
    Delete,
    Call,
    CreateTable,
    CreateIndex,
    CreateView,
    CreateTrigger,
    CreateProcedure,
    DropTable,
    DropIndex,
    DropView,
    DropTrigger,
    DropProcedure,
    AlterTable,
    Savepoint,
    Release,
    Values,
}

impl StmtType {
    /// Check if statement changes the schema
    pub fn is_ddl(&self) -> bool {
        matches!(
            self,
            StmtType::CreateTable
                | StmtType::CreateIndex
                | StmtType::CreateView
                | StmtType::CreateTrigger
                | StmtType::CreateProcedure
                | StmtType::DropTable
                | StmtType::DropIndex
                | StmtType::DropView
                | StmtType::DropTrigger
                | StmtType::DropProcedure
                | StmtType::AlterTable
        )
    }

    /// Check if statement is INSERT, UPDATE or DELETE
    pub fn modifies_rows(&self) -> bool {
        matches!(self, StmtType::Insert | StmtType::Update | StmtType::Delete)
    }

    /// SQL keyword form, for messages
    pub fn as_str(&self) -> &'static str {
        match self {
            StmtType::Select => "SELECT",
            StmtType::Insert => "INSERT",
            StmtType::Update => "UPDATE",
            StmtType::Delete => "DELETE",
            StmtType::Call => "CALL",
            StmtType::CreateTable => "CREATE TABLE",
            StmtType::CreateIndex => "CREATE INDEX",
            StmtType::CreateView => "CREATE VIEW",
            StmtType::CreateTrigger => "CREATE TRIGGER",
            StmtType::CreateProcedure => "CREATE PROCEDURE",
            StmtType::DropTable => "DROP TABLE",
            StmtType::DropIndex => "DROP INDEX",
            StmtType::DropView => "DROP VIEW",
            StmtType::DropTrigger => "DROP TRIGGER",
            StmtType::DropProcedure => "DROP PROCEDURE",
            StmtType::AlterTable => "ALTER TABLE",
            StmtType::Savepoint => "SAVEPOINT",
            StmtType::Release => "RELEASE",
            StmtType::Values => "VALUES",
        }
    }
}

/// Gate consulted before running any statement issued from a trigger body.
pub trait StatementValidator {
    fn validate_statement(&self, stmt: StmtType) -> Result<()>;
}
