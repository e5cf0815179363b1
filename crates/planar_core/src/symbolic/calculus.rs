use super::expr::{Expr, Function};
use std::collections::BTreeMap;

impl Expr {
    /// Partial derivative with respect to the symbol `var`.
    pub fn diff(&self, var: &str) -> Expr {
        if !self.contains_symbol(var) {
            return Expr::zero();
        }
        match self {
            Expr::Symbol(name) => {
                if name == var {
                    Expr::one()
                } else {
                    Expr::zero()
                }
            }
            Expr::Number(_) | Expr::ImaginaryUnit => Expr::zero(),
            Expr::Add(terms) => Expr::sum(terms.iter().map(|t| t.diff(var)).collect()),
            Expr::Mul(factors) => {
                // Product rule: sum over i of f_i' * prod_{j != i} f_j.
                let mut terms = Vec::with_capacity(factors.len());
                for (i, factor) in factors.iter().enumerate() {
                    let d = factor.diff(var);
                    if d.is_zero() {
                        continue;
                    }
                    let mut parts = Vec::with_capacity(factors.len());
                    parts.push(d);
                    for (j, other) in factors.iter().enumerate() {
                        if i != j {
                            parts.push(other.clone());
                        }
                    }
                    terms.push(Expr::product(parts));
                }
                Expr::sum(terms)
            }
            Expr::Pow(base, exponent) => {
                let base = (**base).clone();
                let exponent = (**exponent).clone();
                if !exponent.contains_symbol(var) {
                    // d(u^n) = n * u^(n-1) * u'
                    let reduced = Expr::sum(vec![exponent.clone(), Expr::integer(-1)]);
                    return Expr::product(vec![
                        exponent,
                        Expr::power(base.clone(), reduced),
                        base.diff(var),
                    ]);
                }
                // d(u^v) = u^v * (v' * ln(u) + v * u' / u)
                let whole = Expr::power(base.clone(), exponent.clone());
                let log_term = Expr::product(vec![
                    exponent.diff(var),
                    Expr::call(Function::Ln, base.clone()),
                ]);
                let ratio_term = Expr::product(vec![exponent, base.diff(var), base.recip()]);
                Expr::product(vec![whole, Expr::sum(vec![log_term, ratio_term])])
            }
            Expr::Call(function, arg) => {
                let inner = arg.diff(var);
                let arg = (**arg).clone();
                let outer = match function {
                    Function::Sin => Expr::call(Function::Cos, arg),
                    Function::Cos => -Expr::call(Function::Sin, arg),
                    Function::Tan => Expr::sum(vec![
                        Expr::one(),
                        Expr::power(Expr::call(Function::Tan, arg), Expr::integer(2)),
                    ]),
                    Function::Exp => Expr::call(Function::Exp, arg),
                    Function::Ln => arg.recip(),
                };
                Expr::product(vec![outer, inner])
            }
        }
    }

    /// Replaces symbols by expressions and re-canonicalizes.
    pub fn substitute(&self, bindings: &BTreeMap<String, Expr>) -> Expr {
        if bindings.is_empty() {
            return self.clone();
        }
        match self {
            Expr::Symbol(name) => bindings.get(name).cloned().unwrap_or_else(|| self.clone()),
            Expr::Number(_) | Expr::ImaginaryUnit => self.clone(),
            Expr::Add(terms) => Expr::sum(terms.iter().map(|t| t.substitute(bindings)).collect()),
            Expr::Mul(factors) => {
                Expr::product(factors.iter().map(|f| f.substitute(bindings)).collect())
            }
            Expr::Pow(base, exponent) => {
                Expr::power(base.substitute(bindings), exponent.substitute(bindings))
            }
            Expr::Call(function, arg) => Expr::call(*function, arg.substitute(bindings)),
        }
    }

    pub fn substitute_one(&self, name: &str, value: &Expr) -> Expr {
        let mut bindings = BTreeMap::new();
        bindings.insert(name.to_string(), value.clone());
        self.substitute(&bindings)
    }
}

#[cfg(test)]
mod tests {
    use crate::symbolic::{parse, Expr};

    fn d(text: &str, var: &str) -> Expr {
        parse(text).unwrap().diff(var).simplify()
    }

    fn p(text: &str) -> Expr {
        parse(text).unwrap().simplify()
    }

    #[test]
    fn test_polynomial_derivatives() {
        assert_eq!(d("x^3 + 2*x*y - y", "x"), p("3*x^2 + 2*y"));
        assert_eq!(d("x^3 + 2*x*y - y", "y"), p("2*x - 1"));
        assert_eq!(d("a*x", "y"), Expr::zero());
    }

    #[test]
    fn test_quotient_and_chain_rules() {
        assert_eq!(d("1/x", "x"), p("-1/x^2"));
        assert_eq!(d("sin(x^2)", "x"), p("2*x*cos(x^2)"));
        assert_eq!(d("exp(2*x)", "x"), p("2*exp(2*x)"));
        assert_eq!(d("ln(x)", "x"), p("1/x"));
        assert_eq!(d("sqrt(x)", "x"), p("1/(2*sqrt(x))"));
    }

    #[test]
    fn test_substitution() {
        let e = parse("x^2 + a*y").unwrap();
        let s = e.substitute_one("x", &Expr::integer(3));
        assert_eq!(s, p("9 + a*y"));
        let s = s.substitute_one("y", &parse("1/a").unwrap());
        assert_eq!(s, Expr::integer(10));
    }
}
