/*!
Re-export of common values and datatypes used for running and analyzing
simulations. Must be imported manually.

```
use fee_market_sim::prelude::*;
```
*/

use crate::{
    basefee, chain, config, demand, results, simulation, transaction, txpool,
    user, userpool,
};

pub use basefee::{next_basefee, update_basefee, worst_case_basefee};

pub use chain::{Block, BlockHash, Chain, ChainError, TxRecord};

pub use config::{Environment, Gas, Protocol, Wei, GWEI};

pub use demand::{
    DemandError, DemandMix, DemandSchedule, UserFactory,
};

pub use results::{Format, MetricsTable, RoundMetrics};

pub use simulation::{
    Simulation, SimulationBuildError, SimulationBuilder, SimulationError,
    SimulationGroup, SimulationOutput,
};

pub use transaction::{Transaction, TransactionError, TxHash, TxKind};

pub use txpool::{PoolError, TxPool};

pub use user::{
    BidProfile, CostModel, FixedPrice, Optimistic, Patient, PayoffGate,
    Strategic, User, UserId,
};

pub use userpool::{RegistryError, UserPool};
