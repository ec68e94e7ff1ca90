//! # Client Repository
//!
//! CRUD for client companies and the scope filter used by listings.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};

use crate::models::client::{self, ActiveModel as ClientActiveModel, Entity as Client};
use crate::models::employee::{self, Entity as Employee};
use crate::policy::Scope;

/// Fields of a client to create.
#[derive(Debug, Clone)]
pub struct NewClient {
    pub name: String,
    pub code: String,
}

/// Partial update; `None` leaves a column untouched.
#[derive(Debug, Clone, Default)]
pub struct ClientChanges {
    pub name: Option<String>,
    pub code: Option<String>,
}

/// Repository for client database operations
pub struct ClientRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> ClientRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<client::Model>, DbErr> {
        Client::find_by_id(id).one(self.db).await
    }

    pub async fn find_by_code(&self, code: &str) -> Result<Option<client::Model>, DbErr> {
        Client::find()
            .filter(client::Column::Code.eq(code))
            .one(self.db)
            .await
    }

    /// Clients visible under `scope`, ordered by name.
    pub async fn list(&self, scope: Scope) -> Result<Vec<client::Model>, DbErr> {
        let query = Client::find().order_by_asc(client::Column::Name);
        let query = match scope {
            Scope::All => query,
            Scope::Client(client_id) => query.filter(client::Column::Id.eq(client_id)),
            Scope::Owner(employee_id) => query
                .inner_join(Employee)
                .filter(employee::Column::Id.eq(employee_id)),
        };
        query.distinct().all(self.db).await
    }

    pub async fn create(&self, new_client: NewClient) -> Result<client::Model, DbErr> {
        let now = Utc::now();
        ClientActiveModel {
            name: Set(new_client.name),
            code: Set(new_client.code),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        }
        .insert(self.db)
        .await
    }

    pub async fn update(
        &self,
        existing: client::Model,
        changes: ClientChanges,
    ) -> Result<client::Model, DbErr> {
        let mut active = existing.into_active_model();
        if let Some(name) = changes.name {
            active.name = Set(name);
        }
        if let Some(code) = changes.code {
            active.code = Set(code);
        }
        active.updated_at = Set(Utc::now().into());
        active.update(self.db).await
    }

    pub async fn delete(&self, id: i32) -> Result<u64, DbErr> {
        Ok(Client::delete_by_id(id).exec(self.db).await?.rows_affected)
    }

    pub async fn employee_count(&self, id: i32) -> Result<u64, DbErr> {
        Employee::find()
            .filter(employee::Column::ClientId.eq(id))
            .count(self.db)
            .await
    }

    pub async fn count(&self) -> Result<u64, DbErr> {
        Client::find().count(self.db).await
    }
}
