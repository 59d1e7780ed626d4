use crate::export::Exporter;
use crate::model::Flow;
use pyo3::prelude::*;

/// Compiles a flow description into a runnable ag2 program.
///
/// The flow is parsed and validated first; no file is written. The API-key
/// accessor is written into the program itself, so the result runs on its own.
///
/// Args:
///     flow_json (str): The flow description as a JSON string.
///     types_as_comments (bool): Write argument types of generated functions
///         as `# type:` comments instead of annotations.
///
/// Returns:
///     str: The source of the generated program.
///
/// Raises:
///     ValueError: If the JSON is malformed, the flow fails validation or an
///         embedded function does not match its contract.
#[pyfunction]
#[pyo3(signature = (flow_json, types_as_comments = false))]
fn export_flow(flow_json: &str, types_as_comments: bool) -> PyResult<String> {
    let flow = Flow::from_json(flow_json)
        .map_err(|e| PyErr::new::<pyo3::exceptions::PyValueError, _>(e.to_string()))?;
    let output = Exporter::builder(&flow)
        .with_types_as_comments(types_as_comments)
        .with_skip_aux_files(true)
        .build()
        .export()
        .map_err(|e| PyErr::new::<pyo3::exceptions::PyValueError, _>(e.to_string()))?;
    Ok(output.program)
}

/// Multi-agent flow compiler.
///
/// This module provides Python bindings to the chatweave Rust library, turning
/// flow descriptions into ag2 programs without leaving Python.
#[pymodule]
fn chatweave(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(export_flow, m)?)?;
    Ok(())
}
