use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

use super::{
    Company, CompanyDirectory, DirectoryError, NewPerson, Person, PersonDirectory, Result,
};
use crate::entity::company::{self, Entity as CompanyEntity};
use crate::entity::person::{self, Entity as PersonEntity};

/// People and companies stored through sea-orm.
#[derive(Debug, Clone)]
pub struct SqlDirectory {
    db: DatabaseConnection,
}

impl SqlDirectory {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Insert a company. Used by seeding and tests; the import never creates companies.
    pub async fn create_company(&self, name: &str, github_url: Option<&str>) -> Result<Company> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DirectoryError::invalid_input("company name is empty"));
        }

        let model = company::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            github_url: Set(github_url.map(str::to_string)),
            created_at: Set(Utc::now().into()),
        }
        .insert(&self.db)
        .await?;

        Ok(model.into())
    }

    pub async fn list_people(&self) -> Result<Vec<Person>> {
        let rows = PersonEntity::find()
            .order_by_asc(person::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(Person::from).collect())
    }
}

impl From<company::Model> for Company {
    fn from(model: company::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            github_url: model.github_url,
        }
    }
}

impl From<person::Model> for Person {
    fn from(model: person::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            bio: model.bio,
            avatar_path: model.avatar_path,
            website: model.website,
            github_url: model.github_url,
            location: model.location,
            company_id: model.company_id,
            is_published: model.is_published,
        }
    }
}

#[async_trait]
impl PersonDirectory for SqlDirectory {
    async fn find_person(&self, github_url: &str, name: &str) -> Result<Option<Person>> {
        let row = PersonEntity::find()
            .filter(
                Condition::any()
                    .add(person::Column::GithubUrl.eq(github_url))
                    .add(person::Column::Name.eq(name)),
            )
            .one(&self.db)
            .await?;
        Ok(row.map(Person::from))
    }

    async fn create_person(&self, new: NewPerson) -> Result<Person> {
        if new.name.trim().is_empty() {
            return Err(DirectoryError::invalid_input("person name is empty"));
        }

        let model = person::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(new.name),
            bio: Set(new.bio),
            avatar_path: Set(new.avatar_path),
            website: Set(new.website),
            github_url: Set(new.github_url),
            location: Set(new.location),
            company_id: Set(new.company_id),
            is_published: Set(new.is_published),
            created_at: Set(Utc::now().into()),
        }
        .insert(&self.db)
        .await?;

        Ok(model.into())
    }
}

#[async_trait]
impl CompanyDirectory for SqlDirectory {
    async fn list_companies(&self) -> Result<Vec<Company>> {
        let rows = CompanyEntity::find()
            .order_by_asc(company::Column::Name)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(Company::from).collect())
    }

    async fn set_github_url(&self, company_id: Uuid, github_url: &str) -> Result<()> {
        let existing = CompanyEntity::find_by_id(company_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| DirectoryError::NotFound {
                context: format!("company id={company_id}"),
            })?;

        let mut model: company::ActiveModel = existing.into();
        model.github_url = Set(Some(github_url.to_string()));
        model.update(&self.db).await?;
        Ok(())
    }
}

#[cfg(all(test, feature = "sqlite", feature = "migrate"))]
mod tests {
    use super::*;
    use crate::db::connect_and_migrate;

    async fn setup() -> SqlDirectory {
        let db = connect_and_migrate("sqlite::memory:")
            .await
            .expect("in-memory database");
        SqlDirectory::new(db)
    }

    #[tokio::test]
    async fn find_person_matches_url_or_name() {
        let dir = setup().await;
        dir.create_person(NewPerson {
            name: "Bob Builder".into(),
            github_url: Some("https://github.com/bob".into()),
            ..NewPerson::default()
        })
        .await
        .expect("create");

        assert!(
            dir.find_person("https://github.com/bob", "Someone Else")
                .await
                .unwrap()
                .is_some()
        );
        assert!(
            dir.find_person("https://github.com/other", "Bob Builder")
                .await
                .unwrap()
                .is_some()
        );
        assert!(
            dir.find_person("https://github.com/other", "Other")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn created_person_keeps_unpublished_flag_and_company() {
        let dir = setup().await;
        let acme = dir.create_company("Acme", None).await.expect("company");

        let person = dir
            .create_person(NewPerson {
                name: "Carol".into(),
                company_id: Some(acme.id),
                ..NewPerson::default()
            })
            .await
            .expect("create");

        assert!(!person.is_published);
        assert_eq!(person.company_id, Some(acme.id));
        assert_eq!(dir.list_people().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn set_github_url_backfills_company() {
        let dir = setup().await;
        let acme = dir.create_company("Acme", None).await.expect("company");

        dir.set_github_url(acme.id, "https://github.com/acme")
            .await
            .expect("update");

        let companies = dir.list_companies().await.unwrap();
        assert_eq!(
            companies[0].github_url.as_deref(),
            Some("https://github.com/acme")
        );

        let err = dir
            .set_github_url(Uuid::new_v4(), "https://github.com/x")
            .await
            .expect_err("unknown company");
        assert!(matches!(err, DirectoryError::NotFound { .. }));
    }

    #[tokio::test]
    async fn rejects_blank_names() {
        let dir = setup().await;
        assert!(dir.create_company("  ", None).await.is_err());
        assert!(dir.create_person(NewPerson::default()).await.is_err());
    }
}
