#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Semaphore;

use attendance_sync::gateway::{RemoteAttendance, RemoteGateway};
use attendance_sync::model::attendance::RecordKind;
use attendance_sync::model::employee::{Employee, EmployeeDraft};
use attendance_sync::{ConnectivityMonitor, GatewayError, LocalStore, SyncCoordinator};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Probe,
    List,
    Fetch(i64),
    Create(String),
    Update(i64),
    Delete(i64),
    Attendance(i64, RecordKind),
    LastRecord(i64),
}

#[derive(Default)]
struct State {
    employees: BTreeMap<i64, Employee>,
    attendance: Vec<RemoteAttendance>,
    next_id: i64,
    calls: Vec<Call>,
    alive: bool,
    failing_attendance: HashSet<i64>,
    failing_codes: HashSet<String>,
    stall: bool,
}

/// In-memory remote authority that records every call and fails on demand.
#[derive(Clone)]
pub struct FakeGateway {
    state: Arc<Mutex<State>>,
    gate: Arc<Semaphore>,
    gated: Arc<Mutex<bool>>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                next_id: 1,
                alive: true,
                ..State::default()
            })),
            gate: Arc::new(Semaphore::new(0)),
            gated: Arc::new(Mutex::new(false)),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn remote_employees(&self) -> Vec<Employee> {
        self.state.lock().unwrap().employees.values().cloned().collect()
    }

    pub fn remote_attendance(&self) -> Vec<RemoteAttendance> {
        self.state.lock().unwrap().attendance.clone()
    }

    pub fn seed_employee(&self, employee: Employee) {
        let mut state = self.state.lock().unwrap();
        state.next_id = state.next_id.max(employee.id + 1);
        state.employees.insert(employee.id, employee);
    }

    pub fn set_alive(&self, alive: bool) {
        self.state.lock().unwrap().alive = alive;
    }

    pub fn fail_attendance_for(&self, employee_id: i64) {
        self.state.lock().unwrap().failing_attendance.insert(employee_id);
    }

    pub fn heal_attendance_for(&self, employee_id: i64) {
        self.state.lock().unwrap().failing_attendance.remove(&employee_id);
    }

    pub fn fail_business_code(&self, code: &str) {
        self.state.lock().unwrap().failing_codes.insert(code.to_string());
    }

    /// Every push sleeps far past any sane timeout.
    pub fn stall(&self) {
        self.state.lock().unwrap().stall = true;
    }

    pub fn heal_business_code(&self, code: &str) {
        self.state.lock().unwrap().failing_codes.remove(code);
    }

    /// Attendance pushes and employee creates block until
    /// [`FakeGateway::release`] is called.
    pub fn hold(&self) {
        *self.gated.lock().unwrap() = true;
    }

    pub fn release(&self) {
        *self.gated.lock().unwrap() = false;
        self.gate.add_permits(1000);
    }

    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }

    async fn pass_gate(&self) -> Result<(), GatewayError> {
        let gated = *self.gated.lock().unwrap();
        if gated {
            let _permit = self
                .gate
                .acquire()
                .await
                .map_err(|e| GatewayError::Transport(e.to_string()))?;
        }
        Ok(())
    }

    async fn delay(&self) {
        let stall = self.state.lock().unwrap().stall;
        if stall {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
    }
}

#[async_trait]
impl RemoteGateway for FakeGateway {
    async fn list_employees(&self) -> Result<Vec<Employee>, GatewayError> {
        self.record(Call::List);
        self.delay().await;
        Ok(self
            .remote_employees()
            .into_iter()
            .filter(|e| e.is_active)
            .collect())
    }

    async fn fetch_employee(&self, id: i64) -> Result<Employee, GatewayError> {
        self.record(Call::Fetch(id));
        self.delay().await;
        self.state
            .lock()
            .unwrap()
            .employees
            .get(&id)
            .cloned()
            .ok_or(GatewayError::Status(404))
    }

    async fn create_employee(&self, employee: &Employee) -> Result<Employee, GatewayError> {
        self.record(Call::Create(employee.business_code.clone()));
        self.delay().await;
        self.pass_gate().await?;

        let mut state = self.state.lock().unwrap();
        if state.failing_codes.contains(&employee.business_code) {
            return Err(GatewayError::Status(500));
        }
        let id = state.next_id;
        state.next_id += 1;
        let created = Employee {
            id,
            ..employee.clone()
        };
        state.employees.insert(id, created.clone());
        Ok(created)
    }

    async fn update_employee(
        &self,
        id: i64,
        employee: &Employee,
    ) -> Result<Employee, GatewayError> {
        self.record(Call::Update(id));
        self.delay().await;

        let mut state = self.state.lock().unwrap();
        if state.failing_codes.contains(&employee.business_code) {
            return Err(GatewayError::Status(500));
        }
        let Some(stored) = state.employees.get_mut(&id) else {
            return Err(GatewayError::Status(404));
        };
        *stored = Employee {
            id,
            ..employee.clone()
        };
        Ok(stored.clone())
    }

    async fn delete_employee(&self, id: i64) -> Result<(), GatewayError> {
        self.record(Call::Delete(id));
        self.delay().await;

        match self.state.lock().unwrap().employees.remove(&id) {
            Some(_) => Ok(()),
            None => Err(GatewayError::Status(404)),
        }
    }

    async fn record_attendance(
        &self,
        employee_id: i64,
        kind: RecordKind,
    ) -> Result<(), GatewayError> {
        self.record(Call::Attendance(employee_id, kind));
        self.delay().await;
        self.pass_gate().await?;

        let mut state = self.state.lock().unwrap();
        if state.failing_attendance.contains(&employee_id) {
            return Err(GatewayError::Transport("connection reset".to_string()));
        }
        let id = state.attendance.len() as i64 + 1;
        state.attendance.push(RemoteAttendance {
            id,
            employee_id,
            kind,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    async fn last_record(
        &self,
        employee_id: i64,
    ) -> Result<Option<RemoteAttendance>, GatewayError> {
        self.record(Call::LastRecord(employee_id));
        self.delay().await;
        Ok(self
            .remote_attendance()
            .into_iter()
            .rev()
            .find(|r| r.employee_id == employee_id))
    }

    async fn probe(&self) -> bool {
        self.record(Call::Probe);
        self.state.lock().unwrap().alive
    }
}

pub struct Harness {
    pub store: LocalStore,
    pub gateway: FakeGateway,
    pub connectivity: ConnectivityMonitor,
    pub coordinator: Arc<SyncCoordinator>,
}

pub async fn harness(reachable: bool) -> Harness {
    harness_with_timeout(reachable, Duration::from_secs(10)).await
}

pub async fn harness_with_timeout(reachable: bool, timeout: Duration) -> Harness {
    let store = LocalStore::connect("sqlite::memory:").await.unwrap();
    let gateway = FakeGateway::new();
    let connectivity = ConnectivityMonitor::new(reachable);
    let coordinator = Arc::new(
        SyncCoordinator::new(
            store.clone(),
            Arc::new(gateway.clone()),
            connectivity.clone(),
        )
        .with_request_timeout(timeout),
    );

    Harness {
        store,
        gateway,
        connectivity,
        coordinator,
    }
}

pub fn draft(code: &str, name: &str) -> EmployeeDraft {
    EmployeeDraft {
        business_code: code.to_string(),
        name: name.to_string(),
        position: "Technician".to_string(),
        is_active: true,
        avatar: None,
    }
}

pub fn employee(id: i64, code: &str, name: &str) -> Employee {
    draft(code, name).into_employee(id)
}
