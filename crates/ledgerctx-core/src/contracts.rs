//! Built-in sample contracts
//!
//! Small contracts written against the dispatch convention. They carry
//! trivial business logic and exist to exercise the execution context:
//! read-through state, dirty tracking, trace records and bounded arithmetic.

use std::sync::OnceLock;

use crate::context::ExecutionContext;
use crate::dispatch::{should, Contract, MethodDescriptor, MethodTable};
use crate::safe_math::{self, Amount};
use crate::value::Value;
use crate::{Error, Result};

/// Names accepted by [`lookup`]
pub const BUILTIN: &[&str] = &["counter", "ledger"];

/// Instantiate a built-in contract by name
pub fn lookup(name: &str) -> Option<Box<dyn Contract>> {
    match name {
        "counter" => Some(Box::new(Counter)),
        "ledger" => Some(Box::new(Ledger)),
        _ => None,
    }
}

/// Read `key` as an amount, treating an absent key as zero
fn amount_at(ctx: &ExecutionContext<'_>, key: &str) -> Result<Amount> {
    match ctx.get(key)? {
        Some(value) => Amount::try_from(&value),
        None => Ok(Amount::zero()),
    }
}

fn string_arg<'a>(args: &'a [Value], index: usize, name: &str) -> Result<&'a str> {
    args[index].as_str().ok_or_else(|| Error::TypeError {
        expected: format!("String for argument '{}'", name),
        found: args[index].type_name().to_string(),
    })
}

// ── Counter ───────────────────────────────────────────────

const COUNTER_KEY: &str = "counter";

/// Single counter slot
#[derive(Debug, Default)]
pub struct Counter;

impl Counter {
    fn table() -> &'static MethodTable<Counter> {
        static TABLE: OnceLock<MethodTable<Counter>> = OnceLock::new();
        TABLE.get_or_init(|| {
            MethodTable::new("counter")
                .default_entry(false, Counter::current)
                .method(MethodDescriptor::read("get", 0), Counter::current)
                .method(MethodDescriptor::write("increment", 0), Counter::increment)
                .method(MethodDescriptor::write("add", 1), Counter::add)
        })
    }

    fn current(&mut self, ctx: &mut ExecutionContext<'_>, _args: &[Value]) -> Result<Option<Value>> {
        Ok(Some(amount_at(ctx, COUNTER_KEY)?.to_value()))
    }

    fn increment(&mut self, ctx: &mut ExecutionContext<'_>, _args: &[Value]) -> Result<Option<Value>> {
        self.add(ctx, &[Value::Integer(1)])
    }

    fn add(&mut self, ctx: &mut ExecutionContext<'_>, args: &[Value]) -> Result<Option<Value>> {
        let delta = Amount::try_from(&args[0])?;
        let next = safe_math::add(&amount_at(ctx, COUNTER_KEY)?, &delta)?;
        ctx.set(COUNTER_KEY, next.to_value());
        Ok(Some(next.to_value()))
    }
}

impl Contract for Counter {
    fn name(&self) -> &str {
        "counter"
    }

    fn methods(&self) -> Vec<MethodDescriptor> {
        Self::table().descriptors()
    }

    fn call(
        &mut self,
        ctx: &mut ExecutionContext<'_>,
        method: &str,
        args: &[Value],
    ) -> Result<Option<Value>> {
        Self::table().dispatch(self, ctx, method, args)
    }
}

// ── Ledger ────────────────────────────────────────────────

const SUPPLY_KEY: &str = "supply";

fn balance_key(account: &str) -> String {
    format!("balance:{}", account)
}

/// Account balances with mint, deposit and transfer.
///
/// `transfer` and `deposit` act on behalf of the call's caller; an
/// anonymous call cannot move funds.
#[derive(Debug, Default)]
pub struct Ledger;

impl Ledger {
    fn table() -> &'static MethodTable<Ledger> {
        static TABLE: OnceLock<MethodTable<Ledger>> = OnceLock::new();
        TABLE.get_or_init(|| {
            MethodTable::new("ledger")
                .default_entry(false, Ledger::supply)
                .method(MethodDescriptor::read("balance", 1), Ledger::balance)
                .method(MethodDescriptor::write("mint", 2), Ledger::mint)
                .method(MethodDescriptor::write("deposit", 0), Ledger::deposit)
                .method(MethodDescriptor::write("transfer", 2), Ledger::transfer)
        })
    }

    fn supply(&mut self, ctx: &mut ExecutionContext<'_>, _args: &[Value]) -> Result<Option<Value>> {
        Ok(Some(amount_at(ctx, SUPPLY_KEY)?.to_value()))
    }

    fn balance(&mut self, ctx: &mut ExecutionContext<'_>, args: &[Value]) -> Result<Option<Value>> {
        let account = string_arg(args, 0, "account")?;
        Ok(Some(amount_at(ctx, &balance_key(account))?.to_value()))
    }

    fn mint(&mut self, ctx: &mut ExecutionContext<'_>, args: &[Value]) -> Result<Option<Value>> {
        let account = string_arg(args, 0, "account")?;
        let amount = Amount::try_from(&args[1])?;
        should(amount > Amount::zero(), "mint amount must be positive")?;

        let key = balance_key(account);
        let balance = safe_math::add(&amount_at(ctx, &key)?, &amount)?;
        let supply = safe_math::add(&amount_at(ctx, SUPPLY_KEY)?, &amount)?;
        ctx.set(key, balance.to_value());
        ctx.set(SUPPLY_KEY, supply.to_value());
        ctx.execute(
            "mint",
            Value::object([("to", Value::from(account)), ("amount", amount.to_value())]),
        );
        Ok(Some(balance.to_value()))
    }

    /// Credit the caller with the value attached to the call
    fn deposit(&mut self, ctx: &mut ExecutionContext<'_>, _args: &[Value]) -> Result<Option<Value>> {
        should(!ctx.origin().is_anonymous(), "deposit requires a caller")?;
        let amount = ctx.value().clone();
        should(amount > Amount::zero(), "deposit requires an attached value")?;

        let caller = ctx.caller().to_string();
        let key = balance_key(&caller);
        let balance = safe_math::add(&amount_at(ctx, &key)?, &amount)?;
        let supply = safe_math::add(&amount_at(ctx, SUPPLY_KEY)?, &amount)?;
        ctx.set(key, balance.to_value());
        ctx.set(SUPPLY_KEY, supply.to_value());
        ctx.execute(
            "deposit",
            Value::object([("to", Value::from(caller)), ("amount", amount.to_value())]),
        );
        Ok(Some(balance.to_value()))
    }

    /// Move `amount` from the caller's balance to `to`
    fn transfer(&mut self, ctx: &mut ExecutionContext<'_>, args: &[Value]) -> Result<Option<Value>> {
        should(!ctx.origin().is_anonymous(), "transfer requires a caller")?;
        let from = ctx.caller().to_string();
        let to = string_arg(args, 0, "to")?;
        let amount = Amount::try_from(&args[1])?;
        should(amount > Amount::zero(), "transfer amount must be positive")?;
        should(from != to, "cannot transfer to the same account")?;

        let from_key = balance_key(&from);
        let to_key = balance_key(to);
        let from_balance = amount_at(ctx, &from_key)?;
        should(from_balance >= amount, "insufficient funds")?;

        let from_balance = safe_math::sub(&from_balance, &amount)?;
        let to_balance = safe_math::add(&amount_at(ctx, &to_key)?, &amount)?;
        ctx.set(from_key, from_balance.to_value());
        ctx.set(to_key, to_balance.to_value());
        ctx.execute(
            "transfer",
            Value::object([
                ("from", Value::from(from.as_str())),
                ("to", Value::from(to)),
                ("amount", amount.to_value()),
            ]),
        );
        Ok(None)
    }
}

impl Contract for Ledger {
    fn name(&self) -> &str {
        "ledger"
    }

    fn methods(&self) -> Vec<MethodDescriptor> {
        Self::table().descriptors()
    }

    fn call(
        &mut self,
        ctx: &mut ExecutionContext<'_>,
        method: &str,
        args: &[Value],
    ) -> Result<Option<Value>> {
        Self::table().dispatch(self, ctx, method, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CallOrigin;
    use crate::dispatch::{CallEntry, ContractInstance};
    use crate::provider::NotFound;
    use crate::store::PersistedState;

    fn call_as(
        contract: &mut dyn Contract,
        state: &PersistedState,
        origin: CallOrigin,
        call: &str,
    ) -> Result<(Option<Value>, Vec<String>)> {
        let ctx = ExecutionContext::with_origin(state, origin);
        let mut instance = ContractInstance::new(contract, ctx);
        let invocation = instance.invoke(&CallEntry::parse(call)?)?;
        Ok((invocation.return_value, instance.context().update_index_list()))
    }

    fn call(
        contract: &mut dyn Contract,
        state: &PersistedState,
        call: &str,
    ) -> Result<(Option<Value>, Vec<String>)> {
        call_as(contract, state, CallOrigin::anonymous(), call)
    }

    fn alice() -> CallOrigin {
        CallOrigin::new("alice", Amount::zero())
    }

    #[test]
    fn test_lookup() {
        for name in BUILTIN {
            assert_eq!(lookup(name).unwrap().name(), *name);
        }
        assert!(lookup("nope").is_none());
    }

    #[test]
    fn test_counter_default_reads_persisted() {
        let mut state = PersistedState::new();
        state.insert("counter", &Value::Integer(4));
        let (ret, dirty) = call(&mut Counter, &state, "").unwrap();
        assert_eq!(ret, Some(Value::Integer(4)));
        assert!(dirty.is_empty());
    }

    #[test]
    fn test_counter_increment_from_nothing() {
        let mut counter = Counter;
        let mut instance = ContractInstance::new(&mut counter, ExecutionContext::new(&NotFound));
        instance.invoke(&CallEntry::method("increment", vec![])).unwrap();
        let invocation = instance.invoke(&CallEntry::method("increment", vec![])).unwrap();
        assert_eq!(invocation.return_value, Some(Value::Integer(2)));
        assert_eq!(instance.context().update_index_list(), vec!["counter"]);
    }

    #[test]
    fn test_counter_add_overflow() {
        let mut state = PersistedState::new();
        state.insert("counter", &Amount::max().to_value());
        assert!(matches!(
            call(&mut Counter, &state, "add(1)"),
            Err(Error::NumberTooBig(_))
        ));
    }

    #[test]
    fn test_direct_call_with_missing_arguments() {
        let mut ctx = ExecutionContext::new(&NotFound);
        assert!(matches!(
            Counter.call(&mut ctx, "add", &[]),
            Err(Error::ArityMismatch { expected: 1, found: 0, .. })
        ));
        assert!(matches!(
            Ledger.call(&mut ctx, "transfer", &[Value::from("bob")]),
            Err(Error::ArityMismatch { expected: 2, found: 1, .. })
        ));
        assert!(ctx.update_index_list().is_empty());
    }

    #[test]
    fn test_ledger_transfer_debits_caller() {
        let mut state = PersistedState::new();
        state.insert("balance:alice", &Value::Integer(10));

        let mut ledger = Ledger;
        let ctx = ExecutionContext::with_origin(&state, alice());
        let mut instance = ContractInstance::new(&mut ledger, ctx);
        instance
            .invoke(&CallEntry::parse(r#"transfer("bob", 4)"#).unwrap())
            .unwrap();
        let ctx = instance.into_context();
        assert_eq!(ctx.get("balance:alice").unwrap(), Some(Value::Integer(6)));
        assert_eq!(ctx.get("balance:bob").unwrap(), Some(Value::Integer(4)));
        assert_eq!(ctx.update_index_list(), vec!["balance:alice", "balance:bob"]);
        assert_eq!(ctx.line_data().len(), 1);
        assert_eq!(
            ctx.line_data()[0].parameters.to_json(),
            serde_json::json!({"from": "alice", "to": "bob", "amount": 4})
        );
    }

    #[test]
    fn test_ledger_anonymous_transfer_rejected() {
        let mut state = PersistedState::new();
        state.insert("balance:alice", &Value::Integer(10));
        assert_eq!(
            call(&mut Ledger, &state, r#"transfer("bob", 1)"#).unwrap_err(),
            Error::ContractError("transfer requires a caller".into())
        );
    }

    #[test]
    fn test_ledger_insufficient_funds() {
        let state = PersistedState::new();
        assert_eq!(
            call_as(&mut Ledger, &state, alice(), r#"transfer("bob", 1)"#).unwrap_err(),
            Error::ContractError("insufficient funds".into())
        );
    }

    #[test]
    fn test_ledger_transfer_from_u64_balance_is_exact() {
        let state =
            PersistedState::from_json_document(r#"{"balance:alice": 18446744073709551615}"#)
                .unwrap();
        let mut ledger = Ledger;
        let ctx = ExecutionContext::with_origin(&state, alice());
        let mut instance = ContractInstance::new(&mut ledger, ctx);

        let balance = instance
            .invoke(&CallEntry::parse(r#"balance("alice")"#).unwrap())
            .unwrap();
        assert_eq!(
            balance.return_value,
            Some(Value::String("18446744073709551615".into()))
        );

        instance
            .invoke(&CallEntry::parse(r#"transfer("bob", 1)"#).unwrap())
            .unwrap();
        let ctx = instance.into_context();
        assert_eq!(
            ctx.get("balance:alice").unwrap(),
            Some(Value::String("18446744073709551614".into()))
        );
        assert_eq!(ctx.get("balance:bob").unwrap(), Some(Value::Integer(1)));
    }

    #[test]
    fn test_ledger_rejects_non_string_account() {
        let state = PersistedState::new();
        assert!(matches!(
            call(&mut Ledger, &state, "balance(7)"),
            Err(Error::TypeError { .. })
        ));
    }

    #[test]
    fn test_ledger_mint_updates_supply() {
        let state = PersistedState::new();
        let (ret, dirty) = call(&mut Ledger, &state, r#"mint("carol", "1000")"#).unwrap();
        assert_eq!(ret, Some(Value::Integer(1000)));
        assert_eq!(dirty, vec!["balance:carol", "supply"]);
    }

    #[test]
    fn test_ledger_deposit_credits_attached_value() {
        let state = PersistedState::new();
        let origin = CallOrigin::new("dave", Amount::from(30));
        let (ret, dirty) = call_as(&mut Ledger, &state, origin, "deposit()").unwrap();
        assert_eq!(ret, Some(Value::Integer(30)));
        assert_eq!(dirty, vec!["balance:dave", "supply"]);

        assert_eq!(
            call_as(&mut Ledger, &state, alice(), "deposit()").unwrap_err(),
            Error::ContractError("deposit requires an attached value".into())
        );
    }
}
