use async_trait::async_trait;
use bson::{doc, Document};
use futures::TryStreamExt;
use mongodb::{Collection, Database};

use crate::dbs::mongo::is_duplicate_key;
use crate::dbs::mongo::models::MongoDocument;
use crate::error::{PersistError, Result};
use crate::trait_client::{Page, RecordStore};
use fanshop_types::Record;

/// CRUD over one collection of [`MongoDocument`]s
pub struct MongoRepository<D: MongoDocument> {
    collection: Collection<D>,
}

impl<D: MongoDocument> Clone for MongoRepository<D> {
    fn clone(&self) -> Self {
        Self {
            collection: self.collection.clone(),
        }
    }
}

impl<D: MongoDocument> MongoRepository<D> {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection(D::COLLECTION),
        }
    }

    pub fn collection(&self) -> &Collection<D> {
        &self.collection
    }

    pub(crate) async fn find_records(&self, filter: Document, sort: Document) -> Result<Vec<D::Record>> {
        let documents: Vec<D> = self
            .collection
            .find(filter)
            .sort(sort)
            .await?
            .try_collect()
            .await?;
        Ok(documents.into_iter().map(D::into_record).collect())
    }

    pub(crate) async fn find_record(&self, filter: Document) -> Result<Option<D::Record>> {
        Ok(self.collection.find_one(filter).await?.map(D::into_record))
    }
}

#[async_trait]
impl<D: MongoDocument> RecordStore<D::Record> for MongoRepository<D> {
    async fn insert(&self, record: D::Record) -> Result<D::Record> {
        let document = D::from_record(record.clone());
        match self.collection.insert_one(&document).await {
            Ok(_) => Ok(record),
            Err(e) if is_duplicate_key(&e) => Err(PersistError::Duplicate {
                kind: <D::Record as Record>::KIND,
                id: record.id().to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn get(&self, id: &str) -> Result<Option<D::Record>> {
        self.find_record(doc! { "_id": id }).await
    }

    async fn list(&self, page: Page) -> Result<Vec<D::Record>> {
        let documents: Vec<D> = self
            .collection
            .find(doc! {})
            .sort(doc! { "createdAt": -1, "_id": 1 })
            .skip(page.skip)
            .limit(page.limit)
            .await?
            .try_collect()
            .await?;
        Ok(documents.into_iter().map(D::into_record).collect())
    }

    async fn replace(&self, record: D::Record) -> Result<Option<D::Record>> {
        let filter = doc! { "_id": record.id() };
        let document = D::from_record(record.clone());
        let result = self.collection.replace_one(filter, &document).await?;
        Ok((result.matched_count > 0).then_some(record))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let result = self.collection.delete_one(doc! { "_id": id }).await?;
        Ok(result.deleted_count > 0)
    }
}
