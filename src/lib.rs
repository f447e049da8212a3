/*!
Agent-based simulator of an EIP-1559 style transaction fee market.

A per-block basefee adjusts to block fullness while a population of
heterogeneous users decides, round by round, whether the current fee
environment is worth bidding into. The closed loop between the two is the
object of study: user behavior moves the fee, the fee moves user behavior.

```
use fee_market_sim::prelude::*;

let group = SimulationBuilder::new()
    .share(0.5, UserFactory::patient())
    .share(0.5, UserFactory::strategic())
    .constant_demand(500.0)
    .with_rounds(20)
    .seed(42)
    .build()
    .unwrap();

let output = group.run_all().unwrap().remove(0);
println!("{}", output.metrics_table(Format::PrettyPrint));
```
*/

pub mod basefee;
pub mod chain;
pub mod config;
pub mod demand;
pub mod prelude;
pub mod results;
pub mod simulation;
pub mod transaction;
pub mod txpool;
pub mod user;
pub mod userpool;

pub(crate) mod utils;
