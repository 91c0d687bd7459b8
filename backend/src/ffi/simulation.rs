//! PyO3 wrapper for PlantSimulation

use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;

use crate::config::PlantConfig;
use crate::orchestrator::PlantSimulation as RustSimulation;

fn runtime_error(context: &str, err: impl std::fmt::Display) -> PyErr {
    PyErr::new::<PyRuntimeError, _>(format!("{}: {}", context, err))
}

/// Python wrapper for the plant simulation
///
/// # Example (from Python)
///
/// ```python
/// from steel_plant_sim_core import PlantSimulation
///
/// sim = PlantSimulation.from_json('{"simulation_time": 1440}')
/// sim.run()
/// print(sim.stats()["heats_completed"])
/// ```
#[pyclass(name = "PlantSimulation")]
pub struct PyPlantSimulation {
    inner: RustSimulation,
}

#[pymethods]
impl PyPlantSimulation {
    /// Build a simulation from a JSON configuration document
    ///
    /// # Errors
    ///
    /// Raises ValueError if the document does not parse or fails validation
    #[staticmethod]
    fn from_json(config: &str) -> PyResult<Self> {
        let config = PlantConfig::from_json_str(config)
            .map_err(|e| PyErr::new::<PyValueError, _>(format!("Invalid config: {}", e)))?;
        let inner = RustSimulation::new(config)
            .map_err(|e| runtime_error("Failed to create simulation", e))?;
        Ok(Self { inner })
    }

    fn start(&mut self) {
        self.inner.start();
    }

    fn pause(&mut self) {
        self.inner.pause();
    }

    fn resume(&mut self) {
        self.inner.resume();
    }

    /// Process one batch of events; returns its time, or None once finished
    fn step(&mut self) -> PyResult<Option<f64>> {
        let result = self
            .inner
            .step()
            .map_err(|e| runtime_error("Step failed", e))?;
        Ok(result.map(|r| r.time))
    }

    /// Run to completion; returns the number of completed heats
    fn run(&mut self) -> PyResult<usize> {
        let summary = self
            .inner
            .run()
            .map_err(|e| runtime_error("Run failed", e))?;
        Ok(summary.heats_completed)
    }

    fn run_until(&mut self, until: f64) -> PyResult<f64> {
        let summary = self
            .inner
            .run_until(until)
            .map_err(|e| runtime_error("Run failed", e))?;
        Ok(summary.end_time)
    }

    fn reset(&mut self) -> PyResult<()> {
        self.inner
            .reset()
            .map_err(|e| runtime_error("Reset failed", e))
    }

    fn now(&self) -> f64 {
        self.inner.now()
    }

    fn snapshot_json(&self) -> PyResult<String> {
        self.inner
            .snapshot_json()
            .map_err(|e| runtime_error("Snapshot failed", e))
    }

    /// Run-level production figures
    ///
    /// Returns a dict with `heats_generated`, `heats_completed`,
    /// `heats_in_plant`, `avg_cycle_time`, `takt_time`, `takt_utilization`
    /// and `total_car_distance`.
    fn stats(&self, py: Python) -> PyResult<Py<PyDict>> {
        let stats = self.inner.stats();
        let dict = PyDict::new_bound(py);
        dict.set_item("heats_generated", stats.heats_generated)?;
        dict.set_item("heats_completed", stats.heats_completed)?;
        dict.set_item("heats_in_plant", stats.heats_in_plant)?;
        dict.set_item("avg_cycle_time", stats.avg_cycle_time)?;
        dict.set_item("takt_time", stats.takt_time)?;
        dict.set_item("takt_utilization", stats.takt_utilization)?;
        dict.set_item("total_car_distance", stats.total_car_distance)?;
        Ok(dict.unbind())
    }
}
