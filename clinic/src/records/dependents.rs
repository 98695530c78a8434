use std::{collections::HashMap, marker::PhantomData};

use sqlx::{PgConnection, PgPool};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    AppState,
    api::models::users::CurrentUser,
    auth::{
        password::{self, Argon2Params},
        permissions::{self, Access},
    },
    db::{
        errors::DbError,
        handlers::{DependentCreateDBRequest, DependentKind, Dependents, Repository, Users},
        models::users::{UserCreateDBRequest, UserDBResponse, UserUpdateDBRequest},
    },
    errors::{Error, Result},
    records::{AccountChanges, DependentRecord, NewAccount, Validate},
    types::{Operation, UserId, abbrev_uuid},
};

/// Authorize-then-mutate operations over patients or doctors.
///
/// Every dependent row is created and deleted together with its user account, inside one
/// transaction. Non-admin principals only reach the single row they own.
pub struct RecordService<K: DependentKind> {
    db: PgPool,
    hashing: Argon2Params,
    _kind: PhantomData<K>,
}

pub(crate) fn email_conflict() -> Error {
    Error::Conflict {
        message: "An account with this email address already exists".to_string(),
    }
}

/// Turn a unique violation on `users` (a registration race) into a conflict.
pub(crate) fn conflict_on_duplicate_email(err: DbError) -> Error {
    if err.is_unique_violation_on("users") {
        email_conflict()
    } else {
        Error::Database(err)
    }
}

fn missing_user(id: UserId) -> Error {
    Error::NotFound {
        resource: "User".to_string(),
        id: id.to_string(),
    }
}

impl<K> RecordService<K>
where
    K: DependentKind,
    K::Fields: Validate,
    K::Changes: Validate,
{
    pub fn new(state: &AppState) -> Self {
        Self {
            db: state.db.clone(),
            hashing: Argon2Params::from(&state.config.auth.password),
            _kind: PhantomData,
        }
    }

    fn not_found(id: Uuid) -> Error {
        Error::NotFound {
            resource: K::LABEL.to_string(),
            id: id.to_string(),
        }
    }

    /// Check the capability, and for owner-scoped grants that `id` is the principal's own row.
    async fn authorize(conn: &mut PgConnection, user: &CurrentUser, operation: Operation, id: Uuid) -> Result<()> {
        match permissions::require(user, K::RESOURCE, operation)? {
            Access::Any => Ok(()),
            Access::Own => {
                let own = Dependents::<K>::new(conn).get_by_user_id(user.id).await?;
                if own.is_some_and(|row| K::row_id(&row) == id) {
                    Ok(())
                } else {
                    Err(Error::InsufficientPermissions {
                        action: operation,
                        resource: K::RESOURCE,
                    })
                }
            }
        }
    }

    #[instrument(skip_all, fields(kind = K::LABEL, principal = %abbrev_uuid(&user.id)), err)]
    pub async fn create(&self, user: &CurrentUser, account: NewAccount, fields: K::Fields) -> Result<DependentRecord<K::Row>> {
        permissions::require(user, K::RESOURCE, Operation::Create)?;
        account.validate()?;
        fields.validate()?;

        let email = account.email.trim().to_string();
        {
            let mut conn = self.db.acquire().await.map_err(DbError::from)?;
            if Users::new(&mut conn).get_user_by_email(&email).await?.is_some() {
                return Err(email_conflict());
            }
        }

        let password_hash = password::hash_password(account.password, self.hashing).await?;

        let mut tx = self.db.begin().await.map_err(DbError::from)?;
        let owner = Users::new(&mut tx)
            .create(&UserCreateDBRequest {
                name: account.name.trim().to_string(),
                email,
                password_hash,
                role: K::OWNER_ROLE,
            })
            .await
            .map_err(conflict_on_duplicate_email)?;

        let record = Dependents::<K>::new(&mut tx)
            .create(&DependentCreateDBRequest {
                user_id: owner.id,
                fields,
            })
            .await?;
        tx.commit().await.map_err(DbError::from)?;

        info!(id = %abbrev_uuid(&K::row_id(&record)), "Registered {}", K::LABEL);
        Ok(DependentRecord { record, user: owner })
    }

    #[instrument(skip_all, fields(kind = K::LABEL, id = %abbrev_uuid(&id)), err)]
    pub async fn get_by_id(&self, user: &CurrentUser, id: Uuid) -> Result<DependentRecord<K::Row>> {
        let mut conn = self.db.acquire().await.map_err(DbError::from)?;
        Self::authorize(&mut conn, user, Operation::Read, id).await?;

        let record = Dependents::<K>::new(&mut conn)
            .get_by_id(id)
            .await?
            .ok_or_else(|| Self::not_found(id))?;

        let owner_id = K::row_user_id(&record);
        let owner = Users::new(&mut conn)
            .get_by_id(owner_id)
            .await?
            .ok_or_else(|| missing_user(owner_id))?;

        Ok(DependentRecord { record, user: owner })
    }

    #[instrument(skip_all, fields(kind = K::LABEL, id = %abbrev_uuid(&id)), err)]
    pub async fn update(
        &self,
        user: &CurrentUser,
        id: Uuid,
        account: AccountChanges,
        changes: K::Changes,
    ) -> Result<DependentRecord<K::Row>> {
        let mut tx = self.db.begin().await.map_err(DbError::from)?;
        Self::authorize(&mut tx, user, Operation::Update, id).await?;
        account.validate()?;
        changes.validate()?;

        let record = Dependents::<K>::new(&mut tx).update(id, &changes).await.map_err(|e| match e {
            DbError::NotFound => Self::not_found(id),
            other => Error::Database(other),
        })?;

        let owner_id = K::row_user_id(&record);
        let owner = Users::new(&mut tx)
            .update(
                owner_id,
                &UserUpdateDBRequest {
                    name: account.name.map(|name| name.trim().to_string()),
                },
            )
            .await
            .map_err(|e| match e {
                DbError::NotFound => missing_user(owner_id),
                other => Error::Database(other),
            })?;
        tx.commit().await.map_err(DbError::from)?;

        Ok(DependentRecord { record, user: owner })
    }

    /// Delete the row and then its account. Either step missing its row rolls both back.
    #[instrument(skip_all, fields(kind = K::LABEL, id = %abbrev_uuid(&id)), err)]
    pub async fn delete(&self, user: &CurrentUser, id: Uuid) -> Result<DependentRecord<K::Row>> {
        let mut tx = self.db.begin().await.map_err(DbError::from)?;
        Self::authorize(&mut tx, user, Operation::Delete, id).await?;

        let mut records = Dependents::<K>::new(&mut tx);
        let record = records.get_by_id(id).await?.ok_or_else(|| Self::not_found(id))?;
        if !records.delete(id).await? {
            return Err(Self::not_found(id));
        }

        let owner_id = K::row_user_id(&record);
        let mut users = Users::new(&mut tx);
        let owner = users.get_by_id(owner_id).await?.ok_or_else(|| missing_user(owner_id))?;
        if !users.delete(owner_id).await? {
            return Err(missing_user(owner_id));
        }
        tx.commit().await.map_err(DbError::from)?;

        info!("Deleted {} and its account", K::LABEL);
        Ok(DependentRecord { record, user: owner })
    }

    #[instrument(skip_all, fields(kind = K::LABEL), err)]
    pub async fn list_all(&self, user: &CurrentUser) -> Result<Vec<DependentRecord<K::Row>>> {
        permissions::require(user, K::RESOURCE, Operation::List)?;

        let mut conn = self.db.acquire().await.map_err(DbError::from)?;
        let rows = Dependents::<K>::new(&mut conn).list().await?;
        let owners = Users::new(&mut conn)
            .get_bulk(rows.iter().map(K::row_user_id).collect())
            .await?;

        Ok(Self::attach_owners(rows, owners))
    }

    /// Pair each row with its account. A row whose account is gone is skipped with a warning.
    fn attach_owners(rows: Vec<K::Row>, mut owners: HashMap<UserId, UserDBResponse>) -> Vec<DependentRecord<K::Row>> {
        rows.into_iter()
            .filter_map(|record| {
                let owner_id = K::row_user_id(&record);
                let Some(user) = owners.remove(&owner_id) else {
                    warn!(
                        id = %abbrev_uuid(&K::row_id(&record)),
                        owner = %abbrev_uuid(&owner_id),
                        "Skipping {} whose account is missing",
                        K::LABEL
                    );
                    return None;
                };
                Some(DependentRecord { record, user })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::models::users::Role,
        db::{
            handlers::{DoctorKind, Mappings, PatientKind},
            models::{
                doctors::{DoctorCreateDBRequest, DoctorUpdateDBRequest},
                mappings::MappingCreateDBRequest,
                patients::{PatientCreateDBRequest, PatientDBResponse, PatientUpdateDBRequest},
            },
        },
        test_utils::{create_test_admin, create_test_state},
    };

    fn account(email: &str) -> NewAccount {
        NewAccount {
            name: "B".to_string(),
            email: email.to_string(),
            password: "p".to_string(),
        }
    }

    fn patient_fields() -> PatientCreateDBRequest {
        PatientCreateDBRequest {
            age: 30,
            gender: "F".to_string(),
            medical_history: "none".to_string(),
        }
    }

    fn doctor_fields() -> DoctorCreateDBRequest {
        DoctorCreateDBRequest {
            specialization: "cardio".to_string(),
            experience_years: 5,
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_admin_creates_patient_with_account(pool: PgPool) {
        let state = create_test_state(pool.clone());
        let admin = create_test_admin(&pool).await;
        let service = RecordService::<PatientKind>::new(&state);

        let created = service.create(&admin, account("b@x.com"), patient_fields()).await.unwrap();
        assert_eq!(created.user.role, Role::Patient);
        assert_eq!(created.user.email, "b@x.com");
        assert_eq!(created.record.user_id, created.user.id);
        assert!(password::verify_string("p", &created.user.password_hash).unwrap());

        let fetched = service.get_by_id(&admin, created.record.id).await.unwrap();
        assert_eq!(fetched.record.id, created.record.id);
        assert_eq!(fetched.user.name, "B");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_only_admin_creates(pool: PgPool) {
        let state = create_test_state(pool.clone());
        let admin = create_test_admin(&pool).await;
        let doctors = RecordService::<DoctorKind>::new(&state);
        let patients = RecordService::<PatientKind>::new(&state);

        let doctor = doctors.create(&admin, account("d@x.com"), doctor_fields()).await.unwrap();
        let principal = CurrentUser::from(doctor.user);

        let err = patients
            .create(&principal, account("p@x.com"), patient_fields())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InsufficientPermissions { .. }));

        let err = doctors
            .create(&principal, account("d2@x.com"), doctor_fields())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InsufficientPermissions { .. }));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_duplicate_email_is_conflict(pool: PgPool) {
        let state = create_test_state(pool.clone());
        let admin = create_test_admin(&pool).await;

        RecordService::<PatientKind>::new(&state)
            .create(&admin, account("same@x.com"), patient_fields())
            .await
            .unwrap();

        let err = RecordService::<DoctorKind>::new(&state)
            .create(&admin, account("same@x.com"), doctor_fields())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict { .. }));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_blank_fields_are_rejected_before_writing(pool: PgPool) {
        let state = create_test_state(pool.clone());
        let admin = create_test_admin(&pool).await;
        let service = RecordService::<DoctorKind>::new(&state);

        let blank = DoctorCreateDBRequest {
            specialization: " ".to_string(),
            experience_years: 1,
        };
        let err = service.create(&admin, account("blank@x.com"), blank).await.unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));

        let mut conn = pool.acquire().await.unwrap();
        assert!(Users::new(&mut conn).get_user_by_email("blank@x.com").await.unwrap().is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_owner_scoped_access(pool: PgPool) {
        let state = create_test_state(pool.clone());
        let admin = create_test_admin(&pool).await;
        let service = RecordService::<PatientKind>::new(&state);

        let alice = service.create(&admin, account("alice@x.com"), patient_fields()).await.unwrap();
        let bob = service.create(&admin, account("bob@x.com"), patient_fields()).await.unwrap();
        let alice_principal = CurrentUser::from(alice.user.clone());

        // Own record is reachable
        service.get_by_id(&alice_principal, alice.record.id).await.unwrap();

        // Someone else's is forbidden for every operation
        let err = service.get_by_id(&alice_principal, bob.record.id).await.unwrap_err();
        assert!(matches!(err, Error::InsufficientPermissions { .. }));
        let err = service
            .update(&alice_principal, bob.record.id, AccountChanges::default(), PatientUpdateDBRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InsufficientPermissions { .. }));
        let err = service.delete(&alice_principal, bob.record.id).await.unwrap_err();
        assert!(matches!(err, Error::InsufficientPermissions { .. }));

        // Listing is admin only
        let err = service.list_all(&alice_principal).await.unwrap_err();
        assert!(matches!(err, Error::InsufficientPermissions { .. }));
        assert_eq!(service.list_all(&admin).await.unwrap().len(), 2);

        // A doctor principal never owns a patient row
        let doctor = RecordService::<DoctorKind>::new(&state)
            .create(&admin, account("doc@x.com"), doctor_fields())
            .await
            .unwrap();
        let err = service
            .get_by_id(&CurrentUser::from(doctor.user), alice.record.id)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InsufficientPermissions { .. }));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_missing_record_is_not_found(pool: PgPool) {
        let state = create_test_state(pool.clone());
        let admin = create_test_admin(&pool).await;
        let service = RecordService::<DoctorKind>::new(&state);
        let id = Uuid::new_v4();

        assert!(matches!(service.get_by_id(&admin, id).await, Err(Error::NotFound { .. })));
        assert!(matches!(
            service
                .update(&admin, id, AccountChanges::default(), DoctorUpdateDBRequest::default())
                .await,
            Err(Error::NotFound { .. })
        ));
        assert!(matches!(service.delete(&admin, id).await, Err(Error::NotFound { .. })));
    }

    #[test]
    fn test_rows_without_account_are_skipped() {
        let owner = UserDBResponse {
            id: Uuid::new_v4(),
            name: "B".to_string(),
            email: "b@x.com".to_string(),
            password_hash: "hash".to_string(),
            role: Role::Patient,
            created_at: chrono::Utc::now(),
        };
        let row = |user_id| PatientDBResponse {
            id: Uuid::new_v4(),
            user_id,
            age: 30,
            gender: "F".to_string(),
            medical_history: "none".to_string(),
        };
        let kept = row(owner.id);
        let orphan = row(Uuid::new_v4());

        let records = RecordService::<PatientKind>::attach_owners(
            vec![orphan, kept.clone()],
            HashMap::from([(owner.id, owner.clone())]),
        );

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].record.id, kept.id);
        assert_eq!(records[0].user.id, owner.id);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_changes_only_given_fields(pool: PgPool) {
        let state = create_test_state(pool.clone());
        let admin = create_test_admin(&pool).await;
        let service = RecordService::<DoctorKind>::new(&state);

        let created = service.create(&admin, account("upd@x.com"), doctor_fields()).await.unwrap();
        let owner = CurrentUser::from(created.user.clone());

        let updated = service
            .update(
                &owner,
                created.record.id,
                AccountChanges {
                    name: Some("Dr. A".to_string()),
                },
                DoctorUpdateDBRequest {
                    specialization: None,
                    experience_years: Some(6),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.user.name, "Dr. A");
        assert_eq!(updated.user.email, "upd@x.com");
        assert_eq!(updated.user.role, Role::Doctor);
        assert_eq!(updated.record.specialization, "cardio");
        assert_eq!(updated.record.experience_years, 6);

        let err = service
            .update(
                &owner,
                created.record.id,
                AccountChanges::default(),
                DoctorUpdateDBRequest {
                    specialization: Some("".to_string()),
                    experience_years: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_delete_removes_account_and_mappings(pool: PgPool) {
        let state = create_test_state(pool.clone());
        let admin = create_test_admin(&pool).await;
        let patients = RecordService::<PatientKind>::new(&state);

        let patient = patients.create(&admin, account("gone@x.com"), patient_fields()).await.unwrap();
        let doctor = RecordService::<DoctorKind>::new(&state)
            .create(&admin, account("stays@x.com"), doctor_fields())
            .await
            .unwrap();

        let mut conn = pool.acquire().await.unwrap();
        Mappings::new(&mut conn)
            .create(&MappingCreateDBRequest {
                patient_id: patient.record.id,
                doctor_id: doctor.record.id,
            })
            .await
            .unwrap();

        // Patients may delete themselves
        let deleted = patients
            .delete(&CurrentUser::from(patient.user.clone()), patient.record.id)
            .await
            .unwrap();
        assert_eq!(deleted.user.id, patient.user.id);

        assert!(Users::new(&mut conn).get_by_id(patient.user.id).await.unwrap().is_none());
        assert!(Mappings::new(&mut conn).list().await.unwrap().is_empty());
        assert!(Users::new(&mut conn).get_by_id(doctor.user.id).await.unwrap().is_some());
    }
}
