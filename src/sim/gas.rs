// Ethereum-style gas schedule; see the yellow paper appendix G and EIP-2929.

pub const TX_BASE_GAS: u64 = 21_000;

// Contract creation.
pub const GAS_CREATE: u64 = 32_000;
pub const GAS_PER_CODE_DEPOSIT_BYTE: u64 = 200;

// Calldata.
pub const GAS_PER_CALLDATA_ZERO_BYTE: u64 = 4;
pub const GAS_PER_CALLDATA_BYTE: u64 = 16;
pub const WORD_WIDTH: usize = 32;

// Memory.
pub const GAS_PER_MEMORY_WORD: u64 = 3;
pub const GAS_PER_COPY_WORD: u64 = 3;

// Logs.
pub const GAS_PER_LOG: u64 = 375;
pub const GAS_PER_LOG_TOPIC: u64 = 375;
pub const GAS_PER_LOG_DATA_BYTE: u64 = 8;

// Storage.
pub const GAS_PER_COLD_STORAGE_ACCESS: u64 = 2_100;
pub const GAS_PER_WARM_STORAGE_ACCESS: u64 = 100;
pub const GAS_PER_ZERO_TO_NONZERO_STORAGE_SET: u64 = 20_000;
pub const GAS_PER_NONZERO_STORAGE_SET: u64 = 2_900;

// Environment opcodes (CALLER, TIMESTAMP).
pub const GAS_PER_ENV_READ: u64 = 2;

pub const DEFAULT_BLOCK_GAS_LIMIT: u64 = 30_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutOfGas {
    pub needed: u64,
    pub remaining: u64,
}

/// Running gas total for one call, bounded by a limit.
#[derive(Debug, Clone, Copy)]
pub struct GasMeter {
    used: u64,
    limit: u64,
}

impl GasMeter {
    pub fn new(limit: u64) -> Self {
        Self { used: 0, limit }
    }

    pub fn charge(&mut self, amount: u64) -> Result<(), OutOfGas> {
        let remaining = self.remaining();
        if amount > remaining {
            self.used = self.limit;
            return Err(OutOfGas {
                needed: amount,
                remaining,
            });
        }
        self.used += amount;
        Ok(())
    }

    pub fn used(&self) -> u64 {
        self.used
    }

    pub fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.used)
    }
}

pub fn words(len: usize) -> u64 {
    len.div_ceil(WORD_WIDTH) as u64
}

pub fn calldata_gas(data: &[u8]) -> u64 {
    data.iter()
        .map(|&b| {
            if b == 0 {
                GAS_PER_CALLDATA_ZERO_BYTE
            } else {
                GAS_PER_CALLDATA_BYTE
            }
        })
        .sum()
}

pub fn log_gas(topics: u64, data_len: usize) -> u64 {
    GAS_PER_LOG + topics * GAS_PER_LOG_TOPIC + GAS_PER_LOG_DATA_BYTE * data_len as u64
}

/// Cost of copying `len` bytes into fresh memory.
pub fn memory_copy_gas(len: usize) -> u64 {
    let w = words(len);
    w * (GAS_PER_MEMORY_WORD + GAS_PER_COPY_WORD) + GAS_PER_COPY_WORD
}

/// Creation transaction for `code_len` bytes of runtime code, shipped as non-zero init code.
pub fn create_gas(code_len: usize) -> u64 {
    TX_BASE_GAS
        + GAS_CREATE
        + code_len as u64 * (GAS_PER_CALLDATA_BYTE + GAS_PER_CODE_DEPOSIT_BYTE)
}
