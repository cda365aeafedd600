use async_trait::async_trait;
use sea_orm::sea_query::{Alias, Expr, Func, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection,
    DbBackend, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, SqlErr, TransactionTrait,
};
use tracing::debug;

use crate::error::ServiceError;
use crate::model::{NewPerson, Person};

use super::entity::{self, Column, Entity as PersonEntity};

/// Persistence operations for person records.
///
/// Every method is a single logical transaction. Existence probes return
/// `Ok(false)` for "not found" so callers can tell it apart from a storage
/// failure.
#[async_trait]
pub trait PersonRepository: Send + Sync {
    /// Insert a person, returning the assigned id.
    async fn add_person(&self, person: &NewPerson) -> Result<i32, ServiceError>;

    async fn get_person(&self, id: i32) -> Result<Person, ServiceError>;

    /// Replace every mutable field of the record with the given id.
    async fn update_person(&self, id: i32, person: &NewPerson) -> Result<(), ServiceError>;

    /// Delete by id, returning the number of removed rows.
    async fn delete_person(&self, id: i32) -> Result<u64, ServiceError>;

    /// All records ordered by id.
    async fn get_all_persons(&self) -> Result<Vec<Person>, ServiceError>;

    /// Exact age match for integer queries, substring match otherwise.
    async fn search_person(&self, query: &str) -> Result<Vec<Person>, ServiceError>;

    /// Whether a record other than `exclude_id` uses `email`.
    async fn check_person_by_email(&self, email: &str, exclude_id: i32)
        -> Result<bool, ServiceError>;

    async fn check_person_by_id(&self, id: i32) -> Result<bool, ServiceError>;
}

/// ORM-based implementation of the `PersonRepository` trait.
#[derive(Clone)]
pub struct SeaOrmPersonRepository {
    db: DatabaseConnection,
}

impl SeaOrmPersonRepository {
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

async fn email_taken<C: ConnectionTrait>(
    conn: &C,
    email: &str,
    exclude_id: i32,
) -> Result<bool, DbErr> {
    let count = PersonEntity::find()
        .filter(
            Condition::all()
                .add(Column::Email.eq(email))
                .add(Column::Id.ne(exclude_id)),
        )
        .count(conn)
        .await?;
    Ok(count > 0)
}

/// Case-sensitive literal substring match, `position(col, needle) > 0`.
fn contains_exact(backend: DbBackend, col: Column, needle: &str) -> SimpleExpr {
    let position = match backend {
        DbBackend::Postgres => "strpos",
        _ => "instr",
    };
    Expr::expr(
        Func::cust(Alias::new(position))
            .arg(Expr::col(col))
            .arg(needle),
    )
    .gt(0)
}

/// Map unique index violations on write to `EmailExists`.
fn write_err(err: DbErr, email: &str) -> ServiceError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => ServiceError::EmailExists(email.to_owned()),
        _ => ServiceError::Database(err),
    }
}

#[async_trait]
impl PersonRepository for SeaOrmPersonRepository {
    async fn add_person(&self, person: &NewPerson) -> Result<i32, ServiceError> {
        let txn = self.db.begin().await?;

        // Ids are positive, so 0 excludes nothing
        if email_taken(&txn, &person.email, 0).await? {
            return Err(ServiceError::EmailExists(person.email.clone()));
        }

        let model = entity::ActiveModel::from(person)
            .insert(&txn)
            .await
            .map_err(|e| write_err(e, &person.email))?;

        txn.commit().await?;

        debug!(id = model.id, "Inserted person");
        Ok(model.id)
    }

    async fn get_person(&self, id: i32) -> Result<Person, ServiceError> {
        PersonEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(Into::into)
            .ok_or(ServiceError::NotFound)
    }

    async fn update_person(&self, id: i32, person: &NewPerson) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;

        if email_taken(&txn, &person.email, id).await? {
            return Err(ServiceError::EmailExists(person.email.clone()));
        }

        let result = PersonEntity::update_many()
            .col_expr(Column::Name, Expr::value(person.name.clone()))
            .col_expr(Column::Surname, Expr::value(person.surname.clone()))
            .col_expr(Column::Age, Expr::value(person.age))
            .col_expr(Column::Email, Expr::value(person.email.clone()))
            .col_expr(Column::Telephone, Expr::value(person.telephone.clone()))
            .filter(Column::Id.eq(id))
            .exec(&txn)
            .await
            .map_err(|e| write_err(e, &person.email))?;

        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound);
        }

        txn.commit().await?;
        Ok(())
    }

    async fn delete_person(&self, id: i32) -> Result<u64, ServiceError> {
        let result = PersonEntity::delete_by_id(id).exec(&self.db).await?;
        Ok(result.rows_affected)
    }

    async fn get_all_persons(&self) -> Result<Vec<Person>, ServiceError> {
        let models = PersonEntity::find()
            .order_by_asc(Column::Id)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn search_person(&self, query: &str) -> Result<Vec<Person>, ServiceError> {
        let query = query.trim();

        let condition = match query.parse::<i32>() {
            Ok(age) => Condition::all().add(Column::Age.eq(age)),
            Err(_) => {
                let backend = self.db.get_database_backend();
                [Column::Name, Column::Surname, Column::Email, Column::Telephone]
                    .into_iter()
                    .fold(Condition::any(), |cond, col| {
                        cond.add(contains_exact(backend, col, query))
                    })
            }
        };

        let models = PersonEntity::find()
            .filter(condition)
            .order_by_asc(Column::Id)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn check_person_by_email(
        &self,
        email: &str,
        exclude_id: i32,
    ) -> Result<bool, ServiceError> {
        Ok(email_taken(&self.db, email, exclude_id).await?)
    }

    async fn check_person_by_id(&self, id: i32) -> Result<bool, ServiceError> {
        let count = PersonEntity::find_by_id(id).count(&self.db).await?;
        Ok(count > 0)
    }
}
