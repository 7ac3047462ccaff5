//! Repository pattern for database operations
//!
//! Provides a clean interface for all data access operations
//! with proper error handling and transaction support. The repository
//! is the concrete record store behind the priority query engine
//! ([`CaseStore`]) and the status audit ledger ([`ReportStore`]).

use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use crate::ledger::ReportStore;
use crate::query::{CaseFilter, CaseSort, CaseStore, SortField, SortOrder, Urgency};
use async_trait::async_trait;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbBackend,
    DbErr, EntityTrait, Order, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    Statement, TransactionTrait, Value,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Columns exposed for filter dropdowns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DistinctColumn {
    Location,
    InterestedParty,
    Subject,
}

/// Partial update applied to a set of case records at once
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CaseBulkUpdate {
    #[serde(default)]
    pub current_location: Option<String>,

    #[serde(default)]
    pub return_deadline: Option<chrono::NaiveDate>,

    #[serde(default)]
    pub urgent: Option<bool>,
}

impl CaseBulkUpdate {
    pub fn is_empty(&self) -> bool {
        self.current_location.is_none() && self.return_deadline.is_none() && self.urgent.is_none()
    }
}

/// Sortable fields of a report listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportSortField {
    ProcessNumber,
    Month,
    Status,
    UpdatedAt,
}

/// Filter/sort/page parameters for the report listing
#[derive(Debug, Clone, Deserialize)]
pub struct ReportListQuery {
    pub page: u64,

    pub page_size: u64,

    #[serde(default)]
    pub search_term: Option<String>,

    #[serde(default)]
    pub process_number: Option<String>,

    #[serde(default)]
    pub status: Option<ReportStatus>,

    #[serde(default)]
    pub month_start: Option<String>,

    #[serde(default)]
    pub month_end: Option<String>,

    #[serde(default)]
    pub sort_field: Option<ReportSortField>,

    #[serde(default)]
    pub sort_order: Option<SortOrder>,
}

/// One page of account reports with the total match count
#[derive(Debug, Clone, Serialize)]
pub struct ReportPage {
    pub rows: Vec<AccountReport>,
    pub total_count: u64,
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Case Record Operations
    // ========================================================================

    /// Find a case record (movement row) by ID
    pub async fn find_case_by_id(&self, id: Uuid) -> Result<Option<CaseRecord>> {
        CaseRecordEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Insert or rewrite one movement row
    pub async fn save_case(&self, record: CaseRecord) -> Result<CaseRecord> {
        let exists = CaseRecordEntity::find_by_id(record.id)
            .one(self.write_conn())
            .await?
            .is_some();

        let active = case_active(&record);
        if exists {
            active.update(self.write_conn()).await.map_err(Into::into)
        } else {
            active.insert(self.write_conn()).await.map_err(Into::into)
        }
    }

    /// Delete a single movement row
    pub async fn delete_case(&self, id: Uuid) -> Result<bool> {
        let result = CaseRecordEntity::delete_by_id(id)
            .exec(self.write_conn())
            .await?;
        Ok(result.rows_affected > 0)
    }

    /// Delete every movement row sharing the case number (the whole flow)
    pub async fn delete_case_flow(&self, number: &str) -> Result<u64> {
        let result = CaseRecordEntity::delete_many()
            .filter(CaseRecordColumn::Number.eq(number))
            .exec(self.write_conn())
            .await?;
        Ok(result.rows_affected)
    }

    /// Delete the most recent movement of a case, returning its id
    pub async fn delete_latest_movement(&self, number: &str) -> Result<Option<Uuid>> {
        let latest = CaseRecordEntity::find()
            .filter(CaseRecordColumn::Number.eq(number))
            .order_by_desc(CaseRecordColumn::EntryDate)
            .order_by_desc(CaseRecordColumn::UpdatedAt)
            .one(self.write_conn())
            .await?;

        match latest {
            Some(row) => {
                CaseRecordEntity::delete_by_id(row.id)
                    .exec(self.write_conn())
                    .await?;
                Ok(Some(row.id))
            }
            None => Ok(None),
        }
    }

    /// Full movement history of a case, newest entry first
    pub async fn case_history(&self, number: &str) -> Result<Vec<CaseRecord>> {
        CaseRecordEntity::find()
            .filter(CaseRecordColumn::Number.eq(number))
            .order_by_desc(CaseRecordColumn::EntryDate)
            .order_by_desc(CaseRecordColumn::UpdatedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Apply a partial update to a set of movement rows at once
    pub async fn bulk_update_cases(
        &self,
        ids: &[Uuid],
        updates: &CaseBulkUpdate,
        updated_by: Uuid,
    ) -> Result<u64> {
        if ids.is_empty() || updates.is_empty() {
            return Ok(0);
        }

        let mut update = CaseRecordEntity::update_many()
            .col_expr(CaseRecordColumn::UpdatedBy, updated_by.into())
            .col_expr(
                CaseRecordColumn::UpdatedAt,
                chrono::Utc::now().fixed_offset().into(),
            );

        if let Some(ref location) = updates.current_location {
            update = update.col_expr(CaseRecordColumn::CurrentLocation, location.clone().into());
        }
        if let Some(deadline) = updates.return_deadline {
            update = update.col_expr(CaseRecordColumn::ReturnDeadline, deadline.into());
        }
        if let Some(urgent) = updates.urgent {
            update = update.col_expr(CaseRecordColumn::Urgent, urgent.into());
        }

        let result = update
            .filter(CaseRecordColumn::Id.is_in(ids.to_vec()))
            .exec(self.write_conn())
            .await?;
        Ok(result.rows_affected)
    }

    /// Distinct non-empty values of a column, for filter dropdowns
    pub async fn distinct_case_values(&self, column: DistinctColumn) -> Result<Vec<String>> {
        let col = match column {
            DistinctColumn::Location => CaseRecordColumn::CurrentLocation,
            DistinctColumn::InterestedParty => CaseRecordColumn::InterestedParty,
            DistinctColumn::Subject => CaseRecordColumn::Subject,
        };

        let values: Vec<Option<String>> = CaseRecordEntity::find()
            .select_only()
            .column(col)
            .distinct()
            .filter(col.is_not_null())
            .filter(col.ne(""))
            .into_tuple()
            .all(self.read_conn())
            .await?;

        let mut values: Vec<String> = values.into_iter().flatten().collect();
        values.sort();
        Ok(values)
    }

    // ========================================================================
    // Report Listing
    // ========================================================================

    /// List account reports with filters and pagination
    pub async fn list_reports(&self, query: &ReportListQuery) -> Result<ReportPage> {
        if query.page < 1 || query.page_size < 1 {
            return Err(AppError::Validation {
                message: "page and page_size must be >= 1".into(),
                field: Some("page".into()),
            });
        }

        let sort_col = match query.sort_field.unwrap_or(ReportSortField::UpdatedAt) {
            ReportSortField::ProcessNumber => AccountReportColumn::ProcessNumber,
            ReportSortField::Month => AccountReportColumn::Month,
            ReportSortField::Status => AccountReportColumn::Status,
            ReportSortField::UpdatedAt => AccountReportColumn::UpdatedAt,
        };
        let sort_order = match query.sort_order.unwrap_or(SortOrder::Desc) {
            SortOrder::Asc => Order::Asc,
            SortOrder::Desc => Order::Desc,
        };

        let paginator = AccountReportEntity::find()
            .filter(report_condition(query))
            .order_by(sort_col, sort_order)
            .order_by(AccountReportColumn::Id, Order::Asc)
            .paginate(self.read_conn(), query.page_size);

        let total_count = paginator.num_items().await?;
        let rows = paginator.fetch_page(query.page - 1).await?;

        Ok(ReportPage { rows, total_count })
    }
}

fn report_condition(query: &ReportListQuery) -> Condition {
    let mut condition = Condition::all();
    if let Some(ref number) = query.process_number {
        condition =
            condition.add(Expr::col(AccountReportColumn::ProcessNumber).ilike(format!("%{}%", number)));
    }
    if let Some(status) = query.status {
        condition = condition.add(AccountReportColumn::Status.eq(status.as_str()));
    }
    if let Some(ref start) = query.month_start {
        condition = condition.add(AccountReportColumn::Month.gte(start.clone()));
    }
    if let Some(ref end) = query.month_end {
        condition = condition.add(AccountReportColumn::Month.lte(end.clone()));
    }
    if let Some(ref term) = query.search_term {
        let pattern = format!("%{}%", term);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(AccountReportColumn::ProcessNumber).ilike(pattern.clone()))
                .add(Expr::col(AccountReportColumn::Reason).ilike(pattern)),
        );
    }
    condition
}

// ============================================================================
// Case store (priority query engine backend)
// ============================================================================

fn case_condition(filter: &CaseFilter, urgency: Urgency) -> Condition {
    let mut condition =
        Condition::all().add(CaseRecordColumn::Urgent.eq(matches!(urgency, Urgency::Urgent)));

    if let Some(ref term) = filter.search_term {
        let pattern = format!("%{}%", term);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(CaseRecordColumn::Number).ilike(pattern.clone()))
                .add(Expr::col(CaseRecordColumn::InterestedParty).ilike(pattern.clone()))
                .add(Expr::col(CaseRecordColumn::Subject).ilike(pattern)),
        );
    }
    if let Some(ref origin) = filter.origin {
        condition = condition.add(CaseRecordColumn::OriginCode.eq(origin.clone()));
    }
    if let Some(ref location) = filter.location {
        condition =
            condition.add(Expr::col(CaseRecordColumn::CurrentLocation).ilike(format!("%{}%", location)));
    }
    if let Some(start) = filter.entry_date_start {
        condition = condition.add(CaseRecordColumn::EntryDate.gte(start));
    }
    if let Some(end) = filter.entry_date_end {
        condition = condition.add(CaseRecordColumn::EntryDate.lte(end));
    }
    if filter.empty_location {
        condition = condition.add(
            Condition::any()
                .add(CaseRecordColumn::CurrentLocation.is_null())
                .add(CaseRecordColumn::CurrentLocation.eq("")),
        );
    }
    if filter.no_exit_date {
        condition = condition.add(CaseRecordColumn::ExitDate.is_null());
    }
    if let Some(as_of) = filter.overdue_as_of {
        condition = condition.add(CaseRecordColumn::ReturnDeadline.lt(as_of));
    }

    condition
}

fn sort_column(field: SortField) -> CaseRecordColumn {
    match field {
        SortField::EntryDate => CaseRecordColumn::EntryDate,
        SortField::ReturnDeadline => CaseRecordColumn::ReturnDeadline,
        SortField::UpdatedAt => CaseRecordColumn::UpdatedAt,
        SortField::Number => CaseRecordColumn::Number,
    }
}

fn sort_sql(sort: CaseSort) -> String {
    let column = match sort.field {
        SortField::EntryDate => "entry_date",
        SortField::ReturnDeadline => "return_deadline",
        SortField::UpdatedAt => "updated_at",
        SortField::Number => "number",
    };
    let direction = match sort.order {
        SortOrder::Asc => "ASC",
        SortOrder::Desc => "DESC",
    };
    format!("{} {}, id ASC", column, direction)
}

/// Render the case filter as SQL for the latest-per-number view, which the
/// query builder cannot express (`DISTINCT ON` subquery).
fn case_filter_sql(filter: &CaseFilter, urgency: Urgency, values: &mut Vec<Value>) -> String {
    let mut clauses: Vec<String> = Vec::new();

    values.push(matches!(urgency, Urgency::Urgent).into());
    clauses.push(format!("urgent = ${}", values.len()));

    if let Some(ref term) = filter.search_term {
        values.push(format!("%{}%", term).into());
        let p = values.len();
        clauses.push(format!(
            "(number ILIKE ${p} OR interested_party ILIKE ${p} OR subject ILIKE ${p})"
        ));
    }
    if let Some(ref origin) = filter.origin {
        values.push(origin.clone().into());
        clauses.push(format!("origin_code = ${}", values.len()));
    }
    if let Some(ref location) = filter.location {
        values.push(format!("%{}%", location).into());
        clauses.push(format!("current_location ILIKE ${}", values.len()));
    }
    if let Some(start) = filter.entry_date_start {
        values.push(start.into());
        clauses.push(format!("entry_date >= ${}", values.len()));
    }
    if let Some(end) = filter.entry_date_end {
        values.push(end.into());
        clauses.push(format!("entry_date <= ${}", values.len()));
    }
    if filter.empty_location {
        clauses.push("(current_location IS NULL OR current_location = '')".to_string());
    }
    if filter.no_exit_date {
        clauses.push("exit_date IS NULL".to_string());
    }
    if let Some(as_of) = filter.overdue_as_of {
        values.push(as_of.into());
        clauses.push(format!("return_deadline < ${}", values.len()));
    }

    clauses.join(" AND ")
}

/// The latest-per-number derived view: one row per case number, keeping the
/// movement with the most recent entry/exit date
const LATEST_VIEW_SQL: &str = r#"
    SELECT DISTINCT ON (number) *
    FROM case_records
    ORDER BY number, GREATEST(entry_date, COALESCE(exit_date, entry_date)) DESC, updated_at DESC
"#;

#[async_trait]
impl CaseStore for Repository {
    async fn fetch_cases(
        &self,
        filter: &CaseFilter,
        urgency: Urgency,
        sort: CaseSort,
        latest_only: bool,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<CaseRecord>> {
        if latest_only {
            let mut values: Vec<Value> = Vec::new();
            let where_sql = case_filter_sql(filter, urgency, &mut values);
            let sql = format!(
                "SELECT * FROM ({}) latest WHERE {} ORDER BY {} OFFSET {} LIMIT {}",
                LATEST_VIEW_SQL,
                where_sql,
                sort_sql(sort),
                offset,
                limit
            );
            let stmt = Statement::from_sql_and_values(DbBackend::Postgres, &sql, values);

            return CaseRecordEntity::find()
                .from_raw_sql(stmt)
                .all(self.read_conn())
                .await
                .map_err(Into::into);
        }

        let order = match sort.order {
            SortOrder::Asc => Order::Asc,
            SortOrder::Desc => Order::Desc,
        };

        CaseRecordEntity::find()
            .filter(case_condition(filter, urgency))
            .order_by(sort_column(sort.field), order)
            .order_by(CaseRecordColumn::Id, Order::Asc)
            .offset(offset)
            .limit(limit)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn count_cases(
        &self,
        filter: &CaseFilter,
        urgency: Urgency,
        latest_only: bool,
    ) -> Result<u64> {
        if latest_only {
            let mut values: Vec<Value> = Vec::new();
            let where_sql = case_filter_sql(filter, urgency, &mut values);
            let sql = format!(
                "SELECT COUNT(*) AS cnt FROM ({}) latest WHERE {}",
                LATEST_VIEW_SQL, where_sql
            );
            let stmt = Statement::from_sql_and_values(DbBackend::Postgres, &sql, values);

            let row = self
                .read_conn()
                .query_one(stmt)
                .await?
                .ok_or_else(|| AppError::Internal {
                    message: "count query returned no row".into(),
                })?;
            let count: i64 = row.try_get_by_index(0)?;
            return Ok(count as u64);
        }

        CaseRecordEntity::find()
            .filter(case_condition(filter, urgency))
            .count(self.read_conn())
            .await
            .map_err(Into::into)
    }
}

// ============================================================================
// Report store (status audit ledger backend)
// ============================================================================

fn report_active(report: &AccountReport) -> AccountReportActiveModel {
    AccountReportActiveModel {
        id: Set(report.id),
        process_number: Set(report.process_number.clone()),
        interested_party: Set(report.interested_party.clone()),
        month: Set(report.month.clone()),
        status: Set(report.status.clone()),
        reason: Set(report.reason.clone()),
        notes: Set(report.notes.clone()),
        entry_date: Set(report.entry_date),
        exit_date: Set(report.exit_date),
        external_link: Set(report.external_link.clone()),
        version_number: Set(report.version_number),
        created_by: Set(report.created_by),
        updated_by: Set(report.updated_by),
        created_at: Set(report.created_at),
        updated_at: Set(report.updated_at),
    }
}

fn entry_active(entry: &AuditEntry) -> AuditEntryActiveModel {
    AuditEntryActiveModel {
        id: Set(entry.id),
        report_id: Set(entry.report_id),
        version_number: Set(entry.version_number),
        previous_status: Set(entry.previous_status.clone()),
        new_status: Set(entry.new_status.clone()),
        previous_reason: Set(entry.previous_reason.clone()),
        new_reason: Set(entry.new_reason.clone()),
        description: Set(entry.description.clone()),
        changed_by: Set(entry.changed_by),
        changed_by_name: Set(entry.changed_by_name.clone()),
        changed_at: Set(entry.changed_at),
    }
}

fn case_active(record: &CaseRecord) -> CaseRecordActiveModel {
    CaseRecordActiveModel {
        id: Set(record.id),
        number: Set(record.number.clone()),
        origin_code: Set(record.origin_code.clone()),
        entry_date: Set(record.entry_date),
        current_location: Set(record.current_location.clone()),
        exit_date: Set(record.exit_date),
        return_deadline: Set(record.return_deadline),
        urgent: Set(record.urgent),
        subject: Set(record.subject.clone()),
        interested_party: Set(record.interested_party.clone()),
        notes: Set(record.notes.clone()),
        external_link: Set(record.external_link.clone()),
        created_by: Set(record.created_by),
        updated_by: Set(record.updated_by),
        created_at: Set(record.created_at),
        updated_at: Set(record.updated_at),
    }
}

#[async_trait]
impl ReportStore for Repository {
    async fn find_report(&self, id: Uuid) -> Result<Option<AccountReport>> {
        AccountReportEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn reports_by_process_number(&self, process_number: &str) -> Result<Vec<AccountReport>> {
        AccountReportEntity::find()
            .filter(AccountReportColumn::ProcessNumber.eq(process_number))
            .order_by_desc(AccountReportColumn::Month)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn insert_report(&self, report: &AccountReport) -> Result<()> {
        report_active(report).insert(self.write_conn()).await?;
        Ok(())
    }

    async fn update_report(&self, report: &AccountReport) -> Result<()> {
        report_active(report)
            .update(self.write_conn())
            .await
            .map_err(|e| match e {
                DbErr::RecordNotUpdated => AppError::Conflict {
                    message: format!("account report {} no longer exists", report.id),
                },
                other => AppError::Database(other),
            })?;
        Ok(())
    }

    async fn delete_report(&self, id: Uuid) -> Result<bool> {
        let result = AccountReportEntity::delete_by_id(id)
            .exec(self.write_conn())
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn append_entry(&self, entry: &AuditEntry) -> Result<()> {
        entry_active(entry).insert(self.write_conn()).await?;
        Ok(())
    }

    async fn delete_entry(&self, id: Uuid) -> Result<bool> {
        let result = AuditEntryEntity::delete_by_id(id)
            .exec(self.write_conn())
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn entries_by_report(&self, report_id: Uuid) -> Result<Vec<AuditEntry>> {
        AuditEntryEntity::find()
            .filter(AuditEntryColumn::ReportId.eq(report_id))
            .order_by_desc(AuditEntryColumn::ChangedAt)
            .order_by_desc(AuditEntryColumn::VersionNumber)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    // Row write and ledger append land in one transaction here, so the
    // partial-write hazard of the default sequencing cannot occur.
    async fn insert_report_with_entry(
        &self,
        report: &AccountReport,
        entry: &AuditEntry,
    ) -> Result<()> {
        let txn = self.write_conn().begin().await?;
        report_active(report).insert(&txn).await?;
        entry_active(entry).insert(&txn).await?;
        txn.commit().await?;
        Ok(())
    }

    async fn update_report_with_entry(
        &self,
        report: &AccountReport,
        entry: &AuditEntry,
    ) -> Result<()> {
        let txn = self.write_conn().begin().await?;
        report_active(report).update(&txn).await.map_err(|e| match e {
            DbErr::RecordNotUpdated => AppError::Conflict {
                message: format!("account report {} no longer exists", report.id),
            },
            other => AppError::Database(other),
        })?;
        entry_active(entry).insert(&txn).await?;
        txn.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::QueryTrait;

    #[test]
    fn test_case_filter_sql_numbers_parameters_in_order() {
        let filter = CaseFilter {
            search_term: Some("024".into()),
            origin: Some("ASSESSORIA".into()),
            location: None,
            entry_date_start: Some(chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
            entry_date_end: None,
            empty_location: true,
            no_exit_date: true,
            overdue_as_of: None,
        };

        let mut values: Vec<Value> = Vec::new();
        let sql = case_filter_sql(&filter, Urgency::Urgent, &mut values);

        assert_eq!(values.len(), 4);
        assert!(sql.starts_with("urgent = $1"));
        assert!(sql.contains("number ILIKE $2"));
        assert!(sql.contains("origin_code = $3"));
        assert!(sql.contains("entry_date >= $4"));
        assert!(sql.contains("current_location IS NULL"));
        assert!(sql.contains("exit_date IS NULL"));
    }

    #[test]
    fn test_case_filter_sql_matches_case_insensitively() {
        let filter = CaseFilter {
            search_term: Some("fundação".into()),
            location: Some("gabinete".into()),
            ..Default::default()
        };

        let mut values: Vec<Value> = Vec::new();
        let sql = case_filter_sql(&filter, Urgency::NonUrgent, &mut values);

        assert!(sql.contains("interested_party ILIKE"));
        assert!(sql.contains("current_location ILIKE"));
        // No case-sensitive LIKE left behind
        assert!(!sql.replace("ILIKE", "").contains("LIKE"));
    }

    #[test]
    fn test_case_condition_matches_case_insensitively() {
        let filter = CaseFilter {
            search_term: Some("fundação".into()),
            location: Some("gabinete".into()),
            ..Default::default()
        };

        let stmt = CaseRecordEntity::find()
            .filter(case_condition(&filter, Urgency::Urgent))
            .build(DbBackend::Postgres);

        assert!(stmt.sql.contains("ILIKE"));
        assert!(!stmt.sql.replace("ILIKE", "").contains("LIKE"));
    }

    #[test]
    fn test_report_condition_matches_case_insensitively() {
        let query = ReportListQuery {
            page: 1,
            page_size: 20,
            search_term: Some("diária".into()),
            process_number: Some("024".into()),
            status: Some(ReportStatus::Irregular),
            month_start: Some("2024-01".into()),
            month_end: None,
            sort_field: None,
            sort_order: None,
        };

        let stmt = AccountReportEntity::find()
            .filter(report_condition(&query))
            .build(DbBackend::Postgres);

        assert!(stmt.sql.contains("ILIKE"));
        assert!(!stmt.sql.replace("ILIKE", "").contains("LIKE"));
        assert!(stmt.sql.contains("status"));
        assert!(stmt.sql.contains("month"));
    }

    #[test]
    fn test_sort_sql_has_stable_tiebreak() {
        let sql = sort_sql(CaseSort {
            field: SortField::ReturnDeadline,
            order: SortOrder::Desc,
        });
        assert_eq!(sql, "return_deadline DESC, id ASC");
    }
}
