//! # Almacén de Jobs
//! src/jobs/store.rs
//!
//! Mapa `id -> registro` con un Mutex por job. El RwLock del mapa sólo se
//! toma para insertar, quitar o buscar; cada transición bloquea únicamente
//! el registro afectado, así una cancelación y una finalización del mismo
//! job nunca se intercalan.

use crate::error::JobError;
use crate::jobs::types::Job;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use uuid::Uuid;

type Record = Arc<Mutex<Job>>;

/// Almacén en memoria de los registros de jobs
pub struct JobStore {
    jobs: RwLock<HashMap<Uuid, Record>>,

    /// Máximo de registros simultáneos
    max_jobs: usize,
}

impl JobStore {
    pub fn new(max_jobs: usize) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            max_jobs,
        }
    }

    /// Inserta un registro nuevo respetando la capacidad
    pub fn insert(&self, job: Job) -> Result<(), JobError> {
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);

        if jobs.len() >= self.max_jobs {
            return Err(JobError::Capacity {
                resource: "job store",
                capacity: self.max_jobs,
            });
        }

        jobs.insert(job.id, Arc::new(Mutex::new(job)));
        Ok(())
    }

    /// Inserta sin verificar capacidad (restauración desde snapshot)
    pub(crate) fn insert_unchecked(&self, job: Job) {
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        jobs.insert(job.id, Arc::new(Mutex::new(job)));
    }

    /// Copia consistente del registro
    pub fn get(&self, id: &Uuid) -> Option<Job> {
        let record = self.record(id)?;
        let job = record.lock().unwrap_or_else(PoisonError::into_inner);
        Some(job.clone())
    }

    /// Aplica `f` al registro con su lock tomado y devuelve el snapshot resultante
    ///
    /// Si `f` falla el registro queda como estaba: las transiciones de `Job`
    /// validan antes de modificar.
    pub fn update<F>(&self, id: &Uuid, f: F) -> Result<Job, JobError>
    where
        F: FnOnce(&mut Job) -> Result<(), JobError>,
    {
        let record = self.record(id).ok_or(JobError::NotFound(*id))?;
        let mut job = record.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut *job)?;
        Ok(job.clone())
    }

    /// Elimina un registro
    pub fn remove(&self, id: &Uuid) -> Option<Job> {
        let record = {
            let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
            jobs.remove(id)?
        };
        // Esperar a que termine cualquier escritor en curso sobre este job
        let job = record.lock().unwrap_or_else(PoisonError::into_inner);
        Some(job.clone())
    }

    /// Elimina los registros cuyo snapshot cumple `predicate`
    pub fn remove_where<P>(&self, predicate: P) -> Vec<Job>
    where
        P: Fn(&Job) -> bool,
    {
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);

        let doomed: Vec<Uuid> = jobs
            .iter()
            .filter(|(_, record)| {
                let job = record.lock().unwrap_or_else(PoisonError::into_inner);
                predicate(&*job)
            })
            .map(|(id, _)| *id)
            .collect();

        doomed
            .iter()
            .filter_map(|id| jobs.remove(id))
            .map(|record| {
                let job = record.lock().unwrap_or_else(PoisonError::into_inner);
                job.clone()
            })
            .collect()
    }

    /// Snapshots de todos los registros
    pub fn snapshot(&self) -> Vec<Job> {
        let records: Vec<Record> = {
            let jobs = self.jobs.read().unwrap_or_else(PoisonError::into_inner);
            jobs.values().cloned().collect()
        };

        records
            .iter()
            .map(|record| record.lock().unwrap_or_else(PoisonError::into_inner).clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.jobs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn record(&self, id: &Uuid) -> Option<Record> {
        let jobs = self.jobs.read().unwrap_or_else(PoisonError::into_inner);
        jobs.get(id).cloned()
    }
}
