// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
power-of-two arithmetic shared by the sequencer and executors.
*/

///Returns `log2(value)` when `value` is a nonzero power of two.
pub fn exact_log2(value: u32) -> Option<u32> {
    if value.is_power_of_two() {
        Some(value.trailing_zeros())
    } else {
        None
    }
}

///Length of the bitonic network for `2^n` elements: `n(n+1)/2` steps.
pub fn network_steps(log2_elements: u32) -> u32 {
    log2_elements * (log2_elements + 1) / 2
}

///Number of workgroups of `workgroup_size` threads needed to cover `total_elements`,
/// where each thread owns two elements.
pub fn workgroups_for(total_elements: u32, workgroup_size: u32) -> u32 {
    (total_elements - 1).div_ceil(workgroup_size * 2)
}
