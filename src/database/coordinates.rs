use crate::utils::errors::WeaverError;

/**
 * Decode a Cα coordinate entry into `[x, y, z]` triples.
 *
 * Two layouts are accepted. Full precision stores three f32 streams (all x,
 * then all y, then all z). The reduced-precision layout stores, per axis, one
 * f32 start value followed by `n - 1` little-endian i16 differences in
 * milli-Ångström. Up to two trailing terminator bytes are tolerated.
 */
pub fn decode_coordinates(buffer: &[u8], n: usize) -> Result<Vec<[f32; 3]>, WeaverError> {
    if n == 0 {
        return Ok(Vec::new());
    }
    let full_size = n * 3 * 4;
    let reduced_size = 3 * (4 + (n - 1) * 2);

    let body = if buffer.len() >= full_size && buffer.len() <= full_size + 2 {
        &buffer[..full_size]
    } else if buffer.len() >= reduced_size && buffer.len() <= reduced_size + 2 {
        return decode_reduced(&buffer[..reduced_size], n);
    } else {
        return Err(WeaverError::DatabaseFormat(format!(
            "coordinate entry of {} bytes fits neither {} (f32) nor {} (diff16) for {} residues",
            buffer.len(),
            full_size,
            reduced_size,
            n
        )));
    };

    let mut axes = [vec![0.0f32; n], vec![0.0f32; n], vec![0.0f32; n]];
    for (axis, values) in axes.iter_mut().enumerate() {
        for (i, value) in values.iter_mut().enumerate() {
            let at = (axis * n + i) * 4;
            *value = f32::from_le_bytes([body[at], body[at + 1], body[at + 2], body[at + 3]]);
        }
    }
    Ok(collect_triples(&axes, n))
}

fn decode_reduced(body: &[u8], n: usize) -> Result<Vec<[f32; 3]>, WeaverError> {
    let axis_size = 4 + (n - 1) * 2;
    let mut axes = [vec![0.0f32; n], vec![0.0f32; n], vec![0.0f32; n]];
    for (axis, values) in axes.iter_mut().enumerate() {
        let base = axis * axis_size;
        let mut current =
            f32::from_le_bytes([body[base], body[base + 1], body[base + 2], body[base + 3]]) as f64;
        values[0] = current as f32;
        for i in 1..n {
            let at = base + 4 + (i - 1) * 2;
            let diff = i16::from_le_bytes([body[at], body[at + 1]]);
            current += diff as f64 / 1000.0;
            values[i] = current as f32;
        }
    }
    Ok(collect_triples(&axes, n))
}

fn collect_triples(axes: &[Vec<f32>; 3], n: usize) -> Vec<[f32; 3]> {
    (0..n).map(|i| [axes[0][i], axes[1][i], axes[2][i]]).collect()
}

/// Encode coordinates in the full-precision layout; used by tests and tools
/// that materialise fixture databases.
pub fn encode_coordinates(coords: &[[f32; 3]]) -> Vec<u8> {
    let n = coords.len();
    let mut buffer = Vec::with_capacity(n * 12);
    for axis in 0..3 {
        for triple in coords {
            buffer.extend_from_slice(&triple[axis].to_le_bytes());
        }
    }
    buffer
}
